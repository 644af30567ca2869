use std::collections::BTreeMap;

use rand::{rngs::StdRng, SeedableRng};

use crate::error::{check_fraction, check_radius, Result};
use crate::pointcloud::point::{Point, PointCloud};

pub trait PointCloudDecimator {
    fn decimate(&self, points: &[Point]) -> Vec<Point>;

    /// Decimates a whole cloud, copying its metadata onto the result.
    fn decimate_cloud(&self, point_cloud: &PointCloud) -> PointCloud {
        PointCloud {
            points: self.decimate(&point_cloud.points),
            metadata: point_cloud.metadata.clone(),
        }
    }
}

/// Keeps one point per occupied voxel: the one closest to the voxel center.
pub struct VoxelDecimator {
    pub voxel_size: f64,
}

impl VoxelDecimator {
    pub fn new(voxel_size: f64) -> Result<Self> {
        check_radius("voxel size", voxel_size)?;
        Ok(Self { voxel_size })
    }

    fn get_voxel_index(&self, point: &Point) -> (i64, i64, i64) {
        let x_idx = (point.x / self.voxel_size).floor() as i64;
        let y_idx = (point.y / self.voxel_size).floor() as i64;
        let z_idx = (point.z / self.voxel_size).floor() as i64;
        (x_idx, y_idx, z_idx)
    }

    fn get_voxel_center(&self, index: (i64, i64, i64)) -> (f64, f64, f64) {
        let (x_idx, y_idx, z_idx) = index;
        (
            (x_idx as f64 + 0.5) * self.voxel_size,
            (y_idx as f64 + 0.5) * self.voxel_size,
            (z_idx as f64 + 0.5) * self.voxel_size,
        )
    }

    fn squared_distance(a: &Point, b: (f64, f64, f64)) -> f64 {
        (a.x - b.0).powi(2) + (a.y - b.1).powi(2) + (a.z - b.2).powi(2)
    }
}

impl PointCloudDecimator for VoxelDecimator {
    fn decimate(&self, points: &[Point]) -> Vec<Point> {
        // sorted keys keep the output order independent of hashing
        let mut cells: BTreeMap<(i64, i64, i64), &Point> = BTreeMap::new();

        for point in points {
            let index = self.get_voxel_index(point);
            let center = self.get_voxel_center(index);
            cells
                .entry(index)
                .and_modify(|best| {
                    if Self::squared_distance(point, center) < Self::squared_distance(best, center)
                    {
                        *best = point;
                    }
                })
                .or_insert(point);
        }

        log::debug!(
            "voxel decimation ({}): {} -> {} points",
            self.voxel_size,
            points.len(),
            cells.len()
        );

        cells.into_values().cloned().collect()
    }
}

/// Keeps `max(round(fraction * n), 1)` points drawn without replacement.
///
/// A fixed `seed` makes the selection reproducible; `None` draws from OS
/// entropy. Selected points keep their original order.
pub struct RandomDecimator {
    pub fraction: f64,
    pub seed: Option<u64>,
}

impl RandomDecimator {
    pub fn new(fraction: f64, seed: Option<u64>) -> Result<Self> {
        check_fraction("downsample fraction", fraction)?;
        Ok(Self { fraction, seed })
    }

    pub fn sample_size(&self, len: usize) -> usize {
        ((self.fraction * len as f64).round() as usize).clamp(1, len.max(1))
    }
}

impl PointCloudDecimator for RandomDecimator {
    fn decimate(&self, points: &[Point]) -> Vec<Point> {
        if points.is_empty() {
            return Vec::new();
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let amount = self.sample_size(points.len());
        let mut indices = rand::seq::index::sample(&mut rng, points.len(), amount).into_vec();
        indices.sort_unstable();

        indices.into_iter().map(|i| points[i].clone()).collect()
    }
}
