use nalgebra::{Matrix4, Vector3};
use rayon::prelude::*;

use pcd_core::diagnostics::{DiagnosticSink, LogSink};
use pcd_core::error::{PcdError, Result};
use pcd_core::geometry::Polygon;
use pcd_core::pointcloud::point::PointCloud;
use pcd_core::pointcloud::transform::scale_linear;
use pcd_segmentation::{BoundaryExtractor, ClusterExtractor};

use crate::fit::OffsetScaleFitter;
use crate::params::RegistrationParams;
use crate::pose::PoseEstimator;

/// What a successful registration did to the cloud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistrationRecord {
    pub offset: Vector3<f64>,
    pub precision: f64,
    pub scale: f64,
    /// Rotation and scale applied to the local coordinates.
    pub transform: Matrix4<f64>,
}

/// Places a full resolution cloud onto a footprint or a reference cloud.
///
/// Every flow reduces the cloud to a proxy (main cluster, its boundary, ...),
/// estimates rotation, scale and offset on the proxy and then applies them to
/// the caller's cloud. Proxies that are too degenerate to fit end the run with
/// `Ok(None)`; invalid parameters and empty inputs are errors.
pub struct Registrar {
    params: RegistrationParams,
    clusters: ClusterExtractor,
    boundaries: BoundaryExtractor,
    pose: PoseEstimator,
    fitter: OffsetScaleFitter,
    sink: Box<dyn DiagnosticSink>,
}

impl Registrar {
    pub fn new(params: RegistrationParams) -> Self {
        Self::with_sink(params, Box::new(LogSink))
    }

    pub fn with_sink(params: RegistrationParams, sink: Box<dyn DiagnosticSink>) -> Self {
        Registrar {
            params,
            clusters: ClusterExtractor::new(),
            boundaries: BoundaryExtractor::new(),
            pose: PoseEstimator::new(),
            fitter: OffsetScaleFitter,
            sink,
        }
    }

    pub fn params(&self) -> &RegistrationParams {
        &self.params
    }

    pub fn boundaries(&self) -> &BoundaryExtractor {
        &self.boundaries
    }

    /// Registers `point_cloud` onto a footprint given in world coordinates,
    /// using the curvature boundary of its largest cluster as the proxy.
    pub fn register_from_footprint(
        &mut self,
        point_cloud: &mut PointCloud,
        footprint: &Polygon,
    ) -> Result<Option<RegistrationRecord>> {
        let proxy = self.degenerate_as_none(|this| {
            let cluster = this.params.cluster;
            let main = this
                .clusters
                .largest_cluster(point_cloud, cluster.radius, cluster.min_points)?;
            this.sink.record("cluster", "points", main.len() as f64);

            let boundary = this.boundaries.by_curvature(&main, &this.params.curvature)?;
            this.sink.record("boundary", "points", boundary.len() as f64);
            Ok(boundary)
        })?;

        match proxy {
            Some(proxy) => {
                self.register_with_proxy(point_cloud, proxy, footprint.vertices(), &Vector3::zeros())
            }
            None => Ok(None),
        }
    }

    /// Registers `point_cloud` onto an already registered reference cloud,
    /// using its largest cluster as the proxy.
    pub fn register_from_reference(
        &mut self,
        point_cloud: &mut PointCloud,
        reference: &PointCloud,
    ) -> Result<Option<RegistrationRecord>> {
        let proxy = self.degenerate_as_none(|this| {
            let cluster = this.params.cluster;
            let main = this
                .clusters
                .largest_cluster(point_cloud, cluster.radius, cluster.min_points)?;
            this.sink.record("cluster", "points", main.len() as f64);
            Ok(main)
        })?;

        match proxy {
            Some(proxy) => self.register_with_proxy(
                point_cloud,
                proxy,
                &reference.positions(),
                &reference.offset(),
            ),
            None => Ok(None),
        }
    }

    /// Registers `point_cloud` through `proxy`, a cloud sharing its local
    /// frame. `ref_points` plus `ref_offset` are world coordinates.
    ///
    /// The rotation aligning the proxy's principal axes with the reference's
    /// is applied to the proxy, the offset and scale are fitted on the rotated
    /// proxy, and rotation and scale together are applied to `point_cloud`,
    /// which takes over the proxy's registration.
    pub fn register_with_proxy(
        &mut self,
        point_cloud: &mut PointCloud,
        mut proxy: PointCloud,
        ref_points: &[Vector3<f64>],
        ref_offset: &Vector3<f64>,
    ) -> Result<Option<RegistrationRecord>> {
        self.degenerate_as_none(|this| {
            let mut transform = this.pose.find_rotation(&proxy.positions(), ref_points)?;
            proxy.transform(&transform);

            let (offset, scale) = this.fitter.fit(&mut proxy, ref_points, ref_offset)?;
            this.sink.record("fit", "scale", scale);
            this.sink.record("fit", "offset_x", offset.x);
            this.sink.record("fit", "offset_y", offset.y);
            this.sink.record("fit", "offset_z", offset.z);

            point_cloud.copy_registration_from(&proxy);
            scale_linear(&mut transform, scale);
            point_cloud.transform(&transform);

            Ok(RegistrationRecord {
                offset,
                precision: point_cloud.precision(),
                scale,
                transform,
            })
        })
    }

    fn degenerate_as_none<T, F>(&mut self, stage: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        match stage(self) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_data_degeneracy() => {
                log::warn!("registration failed: {err}");
                self.sink.record("registration", "failed", 1.0);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

/// Planar containment of each position in `polygon`, z ignored.
pub fn point_in_polygon_2d(positions: &[Vector3<f64>], polygon: &Polygon) -> Vec<bool> {
    positions
        .par_iter()
        .map(|p| polygon.contains_xy(p.x, p.y))
        .collect()
}

/// Points whose world (x, y) lies inside `polygon`.
pub fn intersect_polygon_2d(point_cloud: &PointCloud, polygon: &Polygon) -> Result<PointCloud> {
    if polygon.len() < 3 {
        return Err(PcdError::Config(format!(
            "polygon needs at least 3 vertices, got {}",
            polygon.len()
        )));
    }
    let inside = point_in_polygon_2d(&point_cloud.world_positions(), polygon);
    Ok(point_cloud.extract_mask(&inside))
}

#[cfg(test)]
mod tests {
    use pcd_core::diagnostics::MemorySink;

    use super::*;

    #[test]
    fn point_in_polygon_ignores_z() {
        let square = Polygon::from_xy([[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
        let positions = [
            Vector3::new(1.0, 1.0, 100.0),
            Vector3::new(3.0, 1.0, 0.0),
            Vector3::new(0.5, 1.5, -7.0),
        ];
        assert_eq!(point_in_polygon_2d(&positions, &square), vec![true, false, true]);

        // ring points are outside whichever edge they sit on
        let on_ring = [
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(2.0, 1.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 2.0, 0.0),
        ];
        assert_eq!(point_in_polygon_2d(&on_ring, &square), vec![false; 4]);
    }

    #[test]
    fn intersect_uses_world_coordinates() {
        let mut pc = PointCloud::from_xyz([[0.5, 0.5, 0.0], [5.0, 5.0, 0.0]]);
        pc.register(Vector3::new(10.0, 10.0, 0.0), 0.001);
        let square = Polygon::from_xy([[10.0, 10.0], [12.0, 10.0], [12.0, 12.0], [10.0, 12.0]]);

        let inside = intersect_polygon_2d(&pc, &square).unwrap();
        assert_eq!(inside.len(), 1);
        assert_eq!(inside.points[0].x, 0.5);
        assert_eq!(inside.metadata, pc.metadata);

        let line = Polygon::from_xy([[0.0, 0.0], [1.0, 1.0]]);
        assert!(matches!(
            intersect_polygon_2d(&pc, &line),
            Err(PcdError::Config(_))
        ));
    }

    #[test]
    fn degenerate_inputs_yield_none() {
        let footprint = Polygon::from_xy([[0.0, 0.0], [4.0, 0.0], [4.0, 2.0], [0.0, 2.0]]);
        let mut registrar = Registrar::with_sink(
            RegistrationParams::default(),
            Box::new(MemorySink::default()),
        );

        let mut single = PointCloud::from_xyz([[1.0, 2.0, 3.0]]);
        assert_eq!(
            registrar
                .register_from_footprint(&mut single, &footprint)
                .unwrap(),
            None
        );
        assert!(!single.is_registered());

        let mut identical = PointCloud::from_xyz([[1.0, 2.0, 3.0]; 300]);
        assert_eq!(
            registrar
                .register_from_footprint(&mut identical, &footprint)
                .unwrap(),
            None
        );
        assert_eq!(identical.points[0].position(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn empty_input_is_an_error() {
        let footprint = Polygon::from_xy([[0.0, 0.0], [4.0, 0.0], [4.0, 2.0]]);
        let mut registrar = Registrar::new(RegistrationParams::default());
        assert!(matches!(
            registrar.register_from_footprint(&mut PointCloud::default(), &footprint),
            Err(PcdError::EmptyInput(_))
        ));
    }

    #[test]
    fn registers_onto_reference_cloud() {
        // 2 x 1 plate sampled every 5 cm, reference is the same plate scaled
        // by 3, turned a quarter turn and placed far away
        let mut coords = Vec::new();
        for i in 0..=40 {
            for j in 0..=20 {
                coords.push([i as f64 * 0.05, j as f64 * 0.05, 0.0]);
            }
        }
        let mut reference = PointCloud::from_xyz(
            coords
                .iter()
                .map(|&[x, y, z]| [-3.0 * y, 3.0 * x, z]),
        );
        reference.register(Vector3::new(5000.0, 6000.0, 10.0), 0.001);
        let mut pc = PointCloud::from_xyz(coords);

        let params = RegistrationParams {
            cluster: pcd_segmentation::params::ClusterParams {
                radius: 0.08,
                min_points: 5,
            },
            ..RegistrationParams::default()
        };
        let mut registrar = Registrar::with_sink(params, Box::new(MemorySink::default()));
        let record = registrar
            .register_from_reference(&mut pc, &reference)
            .unwrap()
            .unwrap();

        assert!((record.scale - 3.0).abs() < 1e-9);
        assert!((record.precision - 3.0).abs() < 1e-9);
        assert_eq!(pc.offset(), record.offset);

        let world = pc.bounding_box().unwrap();
        let world_min = world.min + pc.offset();
        let world_max = world.max + pc.offset();
        let target = reference.bounding_box().unwrap();
        let target_min = target.min + reference.offset();
        let target_max = target.max + reference.offset();
        assert!((world_min - target_min).norm() < 1e-6);
        assert!((world_max - target_max).norm() < 1e-6);
    }
}
