use std::f64::consts::TAU;

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::normals::estimate_normals;
use crate::spatial::GridIndex;

/// Gaps closer than this to the threshold (radians) count as interior.
pub const ANGLE_TOLERANCE: f64 = 1e-9;

/// Flags the points lying on the boundary of a sampled surface.
pub trait BoundaryEstimator {
    fn estimate_boundary_flags(
        &self,
        positions: &[Vector3<f64>],
        angle_threshold: f64,
        search_radius: f64,
        normal_search_radius: f64,
    ) -> Vec<bool>;
}

/// Angle criterion over local neighbourhoods.
///
/// Neighbours within `search_radius` are projected onto the tangent plane
/// given by the estimated normal. A point is on the boundary when the widest
/// angular gap between consecutive projected neighbours exceeds
/// `angle_threshold` (radians) by more than [`ANGLE_TOLERANCE`], so interior
/// points of a square lattice, whose gaps are a quarter turn up to rounding,
/// stay unflagged at a threshold of a quarter turn. Points with fewer than
/// three neighbours or without a normal are never flagged.
#[derive(Debug, Default, Clone, Copy)]
pub struct AngleCriterionEstimator;

impl AngleCriterionEstimator {
    fn max_angle_gap(
        center: &Vector3<f64>,
        normal: &Vector3<f64>,
        neighbors: impl Iterator<Item = Vector3<f64>>,
    ) -> Option<f64> {
        let helper = if normal.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let u = normal.cross(&helper).normalize();
        let v = normal.cross(&u);

        let mut angles: Vec<f64> = neighbors
            .map(|q| q - center)
            .filter(|d| d.norm_squared() > 0.0)
            .map(|d| d.dot(&v).atan2(d.dot(&u)))
            .collect();
        if angles.len() < 3 {
            return None;
        }
        angles.sort_by(f64::total_cmp);

        let wrap = angles[0] + TAU - angles[angles.len() - 1];
        let widest = angles
            .windows(2)
            .map(|w| w[1] - w[0])
            .fold(wrap, f64::max);
        Some(widest)
    }
}

impl BoundaryEstimator for AngleCriterionEstimator {
    fn estimate_boundary_flags(
        &self,
        positions: &[Vector3<f64>],
        angle_threshold: f64,
        search_radius: f64,
        normal_search_radius: f64,
    ) -> Vec<bool> {
        let index = GridIndex::build(positions, search_radius);
        let normals = if normal_search_radius == search_radius {
            estimate_normals(&index, normal_search_radius)
        } else {
            let normal_index = GridIndex::build(positions, normal_search_radius);
            estimate_normals(&normal_index, normal_search_radius)
        };

        positions
            .par_iter()
            .zip(normals.par_iter())
            .map(|(p, normal)| {
                let Some(normal) = normal else {
                    return false;
                };
                let neighbors = index.within(p, search_radius);
                Self::max_angle_gap(p, normal, neighbors.into_iter().map(|j| positions[j]))
                    .is_some_and(|gap| gap > angle_threshold + ANGLE_TOLERANCE)
            })
            .collect()
    }
}
