use nalgebra::Vector3;
use rayon::prelude::*;

use crate::spatial::GridIndex;

/// Per-point cluster assignment; `None` marks noise.
pub type Labels = Vec<Option<usize>>;

/// Density-based clustering capability.
///
/// Cluster ids must be assigned in discovery order so that callers can break
/// ties between equally sized clusters deterministically.
pub trait ClusteringEngine {
    fn cluster(&self, positions: &[Vector3<f64>], radius: f64, min_points: usize) -> Labels;
}

/// DBSCAN over a hash grid.
///
/// A point is a core point when at least `min_points` points (itself
/// included) lie within `radius`. Clusters grow from core points in index
/// order; border points join the first cluster that reaches them.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dbscan;

impl ClusteringEngine for Dbscan {
    fn cluster(&self, positions: &[Vector3<f64>], radius: f64, min_points: usize) -> Labels {
        let index = GridIndex::build(positions, radius);

        let core: Vec<bool> = positions
            .par_iter()
            .map(|p| index.count_within(p, radius) >= min_points)
            .collect();

        let mut labels: Labels = vec![None; positions.len()];
        let mut next_label = 0;
        let mut stack = Vec::new();

        for seed in 0..positions.len() {
            if labels[seed].is_some() || !core[seed] {
                continue;
            }
            let label = next_label;
            next_label += 1;

            labels[seed] = Some(label);
            stack.push(seed);
            while let Some(current) = stack.pop() {
                index.for_each_within(&positions[current], radius, |neighbor| {
                    if labels[neighbor].is_none() {
                        labels[neighbor] = Some(label);
                        if core[neighbor] {
                            stack.push(neighbor);
                        }
                    }
                });
            }
        }

        log::debug!(
            "dbscan (radius {}, min_points {}): {} clusters over {} points",
            radius,
            min_points,
            next_label,
            positions.len()
        );
        labels
    }
}
