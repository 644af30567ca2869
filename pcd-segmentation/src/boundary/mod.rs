mod estimator;

pub use estimator::{AngleCriterionEstimator, BoundaryEstimator, ANGLE_TOLERANCE};

use pcd_core::checkpoint::CheckpointHook;
use pcd_core::error::{check_fraction, check_radius, PcdError, Result};
use pcd_core::geometry::Polygon;
use pcd_core::pointcloud::decimation::decimator::{
    PointCloudDecimator, RandomDecimator, VoxelDecimator,
};
use pcd_core::pointcloud::point::PointCloud;

use crate::cluster::ClusterExtractor;
use crate::dbscan::{ClusteringEngine, Dbscan};
use crate::params::{CenterObjectParams, CurvatureParams, DrivemapBandParams};

/// Strategies for reducing a cloud to the outline used as a pose proxy.
#[derive(Debug, Default, Clone)]
pub struct BoundaryExtractor<B = AngleCriterionEstimator, E = Dbscan> {
    estimator: B,
    clusters: ClusterExtractor<E>,
}

impl BoundaryExtractor<AngleCriterionEstimator, Dbscan> {
    pub fn new() -> Self {
        BoundaryExtractor {
            estimator: AngleCriterionEstimator,
            clusters: ClusterExtractor::new(),
        }
    }
}

impl<B: BoundaryEstimator, E: ClusteringEngine> BoundaryExtractor<B, E> {
    pub fn with_parts(estimator: B, clusters: ClusterExtractor<E>) -> Self {
        BoundaryExtractor {
            estimator,
            clusters,
        }
    }

    /// Ground points of a drive map lying in a band around the footprint ring.
    ///
    /// Points more than `height` above the lowest drive map point are dropped,
    /// the rest are kept when their world (x, y) is closer than `edge_width` to
    /// the ring, on either side. The result may be empty.
    pub fn by_polygon_band(
        &self,
        drivemap: &PointCloud,
        footprint: &Polygon,
        params: &DrivemapBandParams,
    ) -> Result<PointCloud> {
        check_radius("edge width", params.edge_width)?;
        let bbox = drivemap.bounding_box()?;
        let max_z = bbox.min.z + params.height;
        let offset = drivemap.offset();

        let mask: Vec<bool> = drivemap
            .points
            .iter()
            .map(|p| {
                p.z < max_z
                    && footprint.ring_distance_xy(p.x + offset.x, p.y + offset.y)
                        < params.edge_width
            })
            .collect();

        let band = drivemap.extract_mask(&mask);
        log::info!(
            "drivemap band holds {} of {} points",
            band.len(),
            drivemap.len()
        );
        Ok(band)
    }

    /// Points in the lowest `height_fraction` of the cloud's z range.
    pub fn by_lowest_fraction(
        &self,
        point_cloud: &PointCloud,
        height_fraction: f64,
    ) -> Result<PointCloud> {
        check_fraction("height fraction", height_fraction)?;
        let bbox = point_cloud.bounding_box()?;
        let max_z = bbox.min.z + height_fraction * (bbox.max.z - bbox.min.z);

        let mask: Vec<bool> = point_cloud.points.iter().map(|p| p.z <= max_z).collect();
        Ok(point_cloud.extract_mask(&mask))
    }

    /// Points flagged by the boundary estimator.
    ///
    /// An empty result, or one holding every input point, is a
    /// [`PcdError::DegenerateBoundary`].
    pub fn by_curvature(
        &self,
        point_cloud: &PointCloud,
        params: &CurvatureParams,
    ) -> Result<PointCloud> {
        let bbox = point_cloud.bounding_box()?;
        let total = point_cloud.len();

        let search_radius = match params.search_radius {
            Some(radius) => {
                check_radius("search radius", radius)?;
                radius
            }
            None => {
                let radius = 0.01 * bbox.diagonal();
                if radius <= 0.0 {
                    log::warn!("bounding box {bbox} has no extent");
                    return Err(PcdError::DegenerateBoundary { found: 0, total });
                }
                radius
            }
        };
        let normal_search_radius = match params.normal_search_radius {
            Some(radius) => {
                check_radius("normal search radius", radius)?;
                radius
            }
            None => search_radius,
        };
        log::info!(
            "search radius {search_radius:.4}, normal search radius {normal_search_radius:.4}"
        );

        let flags = self.estimator.estimate_boundary_flags(
            &point_cloud.positions(),
            params.angle_threshold,
            search_radius,
            normal_search_radius,
        );
        let found = flags.iter().filter(|&&f| f).count();
        log::info!("Found {found} out of {total} boundary points");

        if found == 0 || found == total {
            return Err(PcdError::DegenerateBoundary { found, total });
        }
        Ok(point_cloud.extract_mask(&flags))
    }

    /// Evenly spaced, flattened outline of the dominant object of a scan.
    ///
    /// The main object is the union of the largest clusters; its curvature
    /// boundary is flattened to a low percentile height, cleared of stray
    /// fragments by a second clustering pass and resampled on a voxel grid.
    /// The main object is handed to `hook` as `mainobject`.
    pub fn boundary_of_center_object(
        &self,
        point_cloud: &PointCloud,
        params: &CenterObjectParams,
        hook: &mut dyn CheckpointHook,
    ) -> Result<PointCloud> {
        let sampled;
        let input = match params.downsample {
            Some(fraction) => {
                log::info!("random downsampling to {fraction}");
                sampled = RandomDecimator::new(fraction, params.seed)?.decimate_cloud(point_cloud);
                &sampled
            }
            None => point_cloud,
        };

        let main = &params.main_object;
        let main_object = self.clusters.largest_clusters_covering(
            input,
            main.fraction,
            main.radius,
            main.min_points,
        )?;
        hook.checkpoint("mainobject", &main_object);

        let mut boundary = self.by_curvature(&main_object, &params.curvature)?;

        let heights: Vec<f64> = boundary.points.iter().map(|p| p.z).collect();
        let floor = percentile(&heights, params.flatten_percentile);
        for point in &mut boundary.points {
            point.z = floor;
        }

        let footprint = &params.footprint;
        let main_boundary = self.clusters.largest_clusters_covering(
            &boundary,
            footprint.fraction,
            footprint.radius,
            footprint.min_points,
        )?;

        let mut resampled = VoxelDecimator::new(params.voxel_size)?.decimate_cloud(&main_boundary);
        resampled.set_srs_same_as(point_cloud);
        log::info!(
            "center object boundary: {} points after resampling",
            resampled.len()
        );
        Ok(resampled)
    }
}

/// Percentile with linear interpolation between closest ranks.
/// `q` is in percent; an empty slice yields NaN.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
