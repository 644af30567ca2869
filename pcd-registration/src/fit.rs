use nalgebra::Vector3;

use pcd_core::error::{PcdError, Result};
use pcd_core::pointcloud::bounding_box::BoundingBox;
use pcd_core::pointcloud::point::PointCloud;

/// Fits a uniform scale and a world offset placing a cloud on a reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct OffsetScaleFitter;

impl OffsetScaleFitter {
    /// Scales `point_cloud` in place and registers it on the reference.
    ///
    /// The scale is the ratio of the reference's x extent to the cloud's; the
    /// vertical extent of an object never matches a ground level footprint.
    /// The offset moves the scaled cloud's bounding box center onto the
    /// reference's (`ref_offset` included). The cloud's precision is
    /// multiplied by the scale.
    ///
    /// Returns `(offset, scale)`.
    pub fn fit(
        &self,
        point_cloud: &mut PointCloud,
        ref_points: &[Vector3<f64>],
        ref_offset: &Vector3<f64>,
    ) -> Result<(Vector3<f64>, f64)> {
        let ref_bbox = BoundingBox::from_positions(ref_points.iter().copied())?;
        let bbox = point_cloud.bounding_box()?;

        let scale = ref_bbox.size().x / bbox.size().x;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(PcdError::DegenerateGeometry(format!(
                "cannot fit scale between x extents {} and {}",
                bbox.size().x,
                ref_bbox.size().x
            )));
        }

        point_cloud.scale(scale);
        let center = bbox.scaled(scale).center();
        let offset = ref_bbox.center() + ref_offset - center;
        let precision = point_cloud.precision() * scale;
        point_cloud.register(offset, precision);

        log::info!(
            "fitted scale {scale:.6}, offset ({:.3}, {:.3}, {:.3})",
            offset.x,
            offset.y,
            offset.z
        );
        Ok((offset, scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PointCloud {
        PointCloud::from_xyz([
            [0.0, 0.0, 0.0],
            [2.0, 1.0, 0.5],
            [1.0, 3.0, 1.0],
            [-1.0, 0.5, 2.0],
        ])
    }

    #[test]
    fn recovers_scale_and_translation() {
        let k = 2.5;
        let t = Vector3::new(100.0, -20.0, 3.0);
        let pc = sample();
        let reference: Vec<Vector3<f64>> = pc.positions().iter().map(|p| p * k + t).collect();

        let mut fitted = pc.clone();
        let (offset, scale) = OffsetScaleFitter
            .fit(&mut fitted, &reference, &Vector3::zeros())
            .unwrap();

        assert!((scale - k).abs() < 1e-12);
        assert!((offset - t).norm() < 1e-9);
        assert!((fitted.precision() - k).abs() < 1e-12);

        let world = BoundingBox::from_positions(fitted.world_positions()).unwrap();
        let target = BoundingBox::from_positions(reference.iter().copied()).unwrap();
        assert!((world.center() - target.center()).norm() < 1e-9);
        assert!((world.size().x - target.size().x).abs() < 1e-9);
    }

    #[test]
    fn reference_offset_and_previous_precision_are_kept() {
        let mut pc = sample();
        pc.register(Vector3::new(7.0, 7.0, 7.0), 0.01);
        let reference = pc.positions();

        let ref_offset = Vector3::new(1000.0, 2000.0, 0.0);
        let (offset, scale) = OffsetScaleFitter
            .fit(&mut pc, &reference, &ref_offset)
            .unwrap();

        assert!((scale - 1.0).abs() < 1e-12);
        assert!((offset - ref_offset).norm() < 1e-9);
        assert!((pc.precision() - 0.01).abs() < 1e-15);
        assert_eq!(pc.offset(), offset);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let mut pc = sample();
        assert!(matches!(
            OffsetScaleFitter.fit(&mut pc, &[], &Vector3::zeros()),
            Err(PcdError::EmptyInput(_))
        ));

        let mut empty = PointCloud::default();
        let reference = sample().positions();
        assert!(matches!(
            OffsetScaleFitter.fit(&mut empty, &reference, &Vector3::zeros()),
            Err(PcdError::EmptyInput(_))
        ));
    }

    #[test]
    fn zero_width_is_degenerate() {
        let mut column =
            PointCloud::from_xyz([[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 0.0, 1.0]]);
        let reference = sample().positions();
        assert!(matches!(
            OffsetScaleFitter.fit(&mut column, &reference, &Vector3::zeros()),
            Err(PcdError::DegenerateGeometry(_))
        ));
    }
}
