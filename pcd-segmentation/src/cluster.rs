use pcd_core::error::{check_fraction, check_radius, PcdError, Result};
use pcd_core::pointcloud::point::PointCloud;

use crate::dbscan::{ClusteringEngine, Dbscan};

/// Picks the dominant cluster(s) of a cloud.
///
/// Clusters are ranked by descending size. Equal sizes keep the engine's
/// discovery order, which for [`Dbscan`] is the order of each cluster's
/// lowest point index.
#[derive(Debug, Default, Clone)]
pub struct ClusterExtractor<E = Dbscan> {
    engine: E,
}

impl ClusterExtractor<Dbscan> {
    pub fn new() -> Self {
        ClusterExtractor { engine: Dbscan }
    }
}

impl<E: ClusteringEngine> ClusterExtractor<E> {
    pub fn with_engine(engine: E) -> Self {
        ClusterExtractor { engine }
    }

    /// Member indices of every cluster with at least `min_points` points,
    /// largest first.
    pub fn ranked_clusters(
        &self,
        point_cloud: &PointCloud,
        radius: f64,
        min_points: usize,
    ) -> Result<Vec<Vec<usize>>> {
        check_radius("cluster radius", radius)?;
        if min_points == 0 {
            return Err(PcdError::Config("min_points must be at least 1".into()));
        }
        if point_cloud.is_empty() {
            return Err(PcdError::EmptyInput("clustering"));
        }

        let labels = self
            .engine
            .cluster(&point_cloud.positions(), radius, min_points);

        let mut clusters: Vec<Vec<usize>> = Vec::new();
        for (i, label) in labels.iter().enumerate() {
            if let Some(label) = *label {
                if clusters.len() <= label {
                    clusters.resize_with(label + 1, Vec::new);
                }
                clusters[label].push(i);
            }
        }
        clusters.retain(|c| c.len() >= min_points);
        // stable: equal sizes keep discovery order
        clusters.sort_by(|a, b| b.len().cmp(&a.len()));

        Ok(clusters)
    }

    pub fn largest_cluster(
        &self,
        point_cloud: &PointCloud,
        radius: f64,
        min_points: usize,
    ) -> Result<PointCloud> {
        let clusters = self.ranked_clusters(point_cloud, radius, min_points)?;
        let largest = clusters
            .first()
            .ok_or(PcdError::NoClusterFound { radius, min_points })?;

        log::info!(
            "largest cluster holds {} of {} points ({} clusters)",
            largest.len(),
            point_cloud.len(),
            clusters.len()
        );
        Ok(point_cloud.extract_indices(largest))
    }

    /// Union of the largest clusters holding at least `fraction` of all
    /// clustered points. Points keep their original order.
    pub fn largest_clusters_covering(
        &self,
        point_cloud: &PointCloud,
        fraction: f64,
        radius: f64,
        min_points: usize,
    ) -> Result<PointCloud> {
        check_fraction("cluster coverage fraction", fraction)?;
        let clusters = self.ranked_clusters(point_cloud, radius, min_points)?;
        if clusters.is_empty() {
            return Err(PcdError::NoClusterFound { radius, min_points });
        }

        let clustered: usize = clusters.iter().map(Vec::len).sum();
        let target = fraction * clustered as f64;

        let mut mask = vec![false; point_cloud.len()];
        let mut covered = 0;
        let mut used = 0;
        for cluster in &clusters {
            if covered as f64 >= target {
                break;
            }
            for &i in cluster {
                mask[i] = true;
            }
            covered += cluster.len();
            used += 1;
        }

        log::info!(
            "{} of {} clusters cover {} of {} clustered points",
            used,
            clusters.len(),
            covered,
            clustered
        );
        Ok(point_cloud.extract_mask(&mask))
    }
}
