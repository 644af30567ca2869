use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

use crate::spatial::GridIndex;

/// Surface normal of every position from a PCA over its neighbours within
/// `radius` (the position itself included).
///
/// Positions with fewer than three neighbours get `None`.
pub fn estimate_normals(index: &GridIndex<'_>, radius: f64) -> Vec<Option<Vector3<f64>>> {
    let positions = index.positions();
    positions
        .par_iter()
        .map(|p| {
            let neighbors = index.within(p, radius);
            if neighbors.len() < 3 {
                return None;
            }

            let mean = neighbors
                .iter()
                .map(|&j| positions[j])
                .sum::<Vector3<f64>>()
                / neighbors.len() as f64;

            let mut covariance = Matrix3::<f64>::zeros();
            for &j in &neighbors {
                let d = positions[j] - mean;
                covariance += d * d.transpose();
            }

            // smallest eigenvector ~ normal
            let eigen = covariance.symmetric_eigen();
            let normal = eigen.eigenvectors.column(eigen.eigenvalues.imin()).into_owned();
            let norm = normal.norm();
            (norm.is_finite() && norm > 0.0).then(|| normal / norm)
        })
        .collect()
}
