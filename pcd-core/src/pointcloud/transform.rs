use nalgebra::{Matrix3, Matrix4, Vector3};

/// Embeds a linear map and a translation into a homogeneous transform.
pub fn homogeneous(linear: &Matrix3<f64>, translation: &Vector3<f64>) -> Matrix4<f64> {
    let mut transform = Matrix4::identity();
    transform.fixed_view_mut::<3, 3>(0, 0).copy_from(linear);
    transform.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    transform
}

pub fn linear_part(transform: &Matrix4<f64>) -> Matrix3<f64> {
    transform.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Multiplies the linear block by `factor`, leaving the translation as is.
pub fn scale_linear(transform: &mut Matrix4<f64>, factor: f64) {
    let mut linear = transform.fixed_view_mut::<3, 3>(0, 0);
    linear *= factor;
}

/// Rotation of 180 degrees about the x axis.
pub fn flip_about_x() -> Matrix4<f64> {
    homogeneous(
        &Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, -1.0)),
        &Vector3::zeros(),
    )
}
