use nalgebra::{Matrix3, Matrix4, Vector3};

use pcd_core::error::{PcdError, Result};
use pcd_core::pointcloud::transform::homogeneous;

/// Eigenvalues below this fraction of the largest one count as vanishing.
const VANISHING_EIGENVALUE: f64 = 1e-10;

/// Principal component analysis of a point set.
pub trait PrincipalAxesSolver {
    /// Orthonormal matrix whose rows are the principal components, ordered
    /// by descending explained variance.
    fn principal_axes(&self, positions: &[Vector3<f64>]) -> Result<Matrix3<f64>>;
}

/// Eigen decomposition of the 3x3 covariance matrix.
///
/// Needs at least three points spanning at least a plane; collinear or
/// coincident points are [`PcdError::DegenerateGeometry`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CovarianceEigenSolver;

impl PrincipalAxesSolver for CovarianceEigenSolver {
    fn principal_axes(&self, positions: &[Vector3<f64>]) -> Result<Matrix3<f64>> {
        let n = positions.len();
        if n < 3 {
            return Err(PcdError::DegenerateGeometry(format!(
                "principal axes need at least 3 points, got {n}"
            )));
        }

        let mean = positions.iter().sum::<Vector3<f64>>() / n as f64;
        let covariance = positions.iter().fold(Matrix3::zeros(), |acc, p| {
            let d = p - mean;
            acc + d * d.transpose()
        }) / n as f64;

        let eigen = covariance.symmetric_eigen();
        let mut order = [0, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let largest = eigen.eigenvalues[order[0]];
        let significant = order
            .iter()
            .filter(|&&i| eigen.eigenvalues[i] > largest * VANISHING_EIGENVALUE)
            .count();
        if !(largest > 0.0) || significant < 2 {
            return Err(PcdError::DegenerateGeometry(format!(
                "covariance of {n} points has rank {significant}"
            )));
        }

        let mut axes = Matrix3::zeros();
        for (row, &i) in order.iter().enumerate() {
            axes.set_row(row, &eigen.eigenvectors.column(i).transpose());
        }
        Ok(axes)
    }
}

/// Resolves the sign ambiguity of PCA axes.
///
/// First makes the basis a proper rotation by negating column 1 when the
/// determinant is negative, then, when the up entry `[(2, 2)]` is negative,
/// negates columns 1 and 2 together (a half turn about axis 0).
pub fn normalize_orientation(mut axes: Matrix3<f64>) -> Matrix3<f64> {
    if axes.determinant() < 0.0 {
        axes.column_mut(1).neg_mut();
    }
    if axes[(2, 2)] < 0.0 {
        axes.column_mut(1).neg_mut();
        axes.column_mut(2).neg_mut();
    }
    axes
}

#[derive(Debug, Default, Clone)]
pub struct PoseEstimator<S = CovarianceEigenSolver> {
    solver: S,
}

impl PoseEstimator<CovarianceEigenSolver> {
    pub fn new() -> Self {
        PoseEstimator {
            solver: CovarianceEigenSolver,
        }
    }
}

impl<S: PrincipalAxesSolver> PoseEstimator<S> {
    pub fn with_solver(solver: S) -> Self {
        PoseEstimator { solver }
    }

    /// Normalized principal axes, a proper rotation with non-negative up entry.
    pub fn principal_axes(&self, positions: &[Vector3<f64>]) -> Result<Matrix3<f64>> {
        Ok(normalize_orientation(self.solver.principal_axes(positions)?))
    }

    /// Rotation taking the principal axes of `positions` onto those of
    /// `reference`, as a homogeneous transform without translation.
    pub fn find_rotation(
        &self,
        positions: &[Vector3<f64>],
        reference: &[Vector3<f64>],
    ) -> Result<Matrix4<f64>> {
        let axes = self.principal_axes(positions)?;
        let reference_axes = self.principal_axes(reference)?;

        // orthonormal, so the transpose is the inverse
        let rotation = reference_axes.transpose() * axes;
        Ok(homogeneous(&rotation, &Vector3::zeros()))
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Rotation3;

    use super::*;

    fn box_shell(size: Vector3<f64>, steps: usize) -> Vec<Vector3<f64>> {
        let mut positions = Vec::new();
        for i in 0..=steps {
            for j in 0..=steps {
                for k in 0..=steps {
                    let on_face = [i, j, k].iter().any(|&c| c == 0 || c == steps);
                    if on_face {
                        let t = Vector3::new(i as f64, j as f64, k as f64) / steps as f64;
                        positions.push(t.component_mul(&size));
                    }
                }
            }
        }
        positions
    }

    fn rotated(positions: &[Vector3<f64>], rotation: &Rotation3<f64>) -> Vec<Vector3<f64>> {
        positions.iter().map(|p| rotation * p).collect()
    }

    #[test]
    fn rotation_onto_itself_is_identity() {
        let estimator = PoseEstimator::new();
        let shell = box_shell(Vector3::new(4.0, 2.0, 1.0), 10);
        let tilted = rotated(&shell, &Rotation3::from_euler_angles(0.3, -0.2, 1.1));

        for cloud in [&shell, &tilted] {
            let transform = estimator.find_rotation(cloud, cloud).unwrap();
            assert!((transform - Matrix4::identity()).abs().max() < 1e-9);
        }
    }

    #[test]
    fn normalized_axes_are_proper_and_point_up() {
        let estimator = PoseEstimator::new();
        let shell = box_shell(Vector3::new(3.0, 1.5, 0.5), 8);
        let angles = [
            (0.0, 0.0, 0.0),
            (0.1, 0.2, 0.3),
            (2.5, -0.4, 1.0),
            (-3.0, 1.2, -2.2),
            (1.5, 3.0, 0.7),
        ];

        for (roll, pitch, yaw) in angles {
            let cloud = rotated(&shell, &Rotation3::from_euler_angles(roll, pitch, yaw));
            let axes = estimator.principal_axes(&cloud).unwrap();
            assert!((axes.determinant() - 1.0).abs() < 1e-9);
            assert!(axes[(2, 2)] >= 0.0);
            assert!((axes * axes.transpose() - Matrix3::identity()).abs().max() < 1e-9);
        }
    }

    #[test]
    fn normalization_fixes_reflections() {
        let reflected = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
        let fixed = normalize_orientation(reflected);
        assert_eq!(fixed, Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, 1.0)));

        let upside_down = Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, -1.0));
        assert_eq!(normalize_orientation(upside_down), Matrix3::identity());
    }

    #[test]
    fn aligns_long_axes() {
        let estimator = PoseEstimator::new();
        let shell = box_shell(Vector3::new(4.0, 2.0, 1.0), 10);
        let turned = rotated(&shell, &Rotation3::from_axis_angle(&Vector3::z_axis(), 0.7));

        let transform = estimator.find_rotation(&turned, &shell).unwrap();
        let aligned: Vec<Vector3<f64>> = turned
            .iter()
            .map(|p| transform.transform_vector(p))
            .collect();

        let extent = |ps: &[Vector3<f64>]| {
            let min = ps.iter().fold(Vector3::repeat(f64::MAX), |m, p| m.inf(p));
            let max = ps.iter().fold(Vector3::repeat(f64::MIN), |m, p| m.sup(p));
            max - min
        };
        assert!((extent(&aligned) - extent(&shell)).abs().max() < 1e-9);
    }

    #[test]
    fn planar_sets_are_accepted() {
        let square = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(4.0, 0.0, 0.0),
            Vector3::new(4.0, 2.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
        ];
        let axes = PoseEstimator::new().principal_axes(&square).unwrap();
        assert!((axes.row(0)[0].abs() - 1.0).abs() < 1e-12);
        assert!((axes[(2, 2)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_sets_are_rejected() {
        let estimator = PoseEstimator::new();
        let two = [Vector3::zeros(), Vector3::x()];
        let line: Vec<Vector3<f64>> = (0..10)
            .map(|i| Vector3::new(i as f64, 2.0 * i as f64, 0.0))
            .collect();
        let same = [Vector3::new(1.0, 1.0, 1.0); 5];

        for cloud in [&two[..], &line[..], &same[..]] {
            assert!(matches!(
                estimator.principal_axes(cloud),
                Err(PcdError::DegenerateGeometry(_))
            ));
        }
    }
}
