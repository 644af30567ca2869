use std::path::Path;

use nalgebra::{Matrix4, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use pcd_core::pointcloud::transform::{flip_about_x, homogeneous, linear_part};

use crate::error::UpVectorError;

/// Up direction of a scan estimated by the capture tooling, in the scan's
/// own frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpVector {
    #[serde(rename = "estimatedUpDirection")]
    pub estimated_up_direction: [f64; 3],
}

impl UpVector {
    pub fn new(direction: Vector3<f64>) -> Self {
        UpVector {
            estimated_up_direction: direction.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, UpVectorError> {
        let text = std::fs::read_to_string(path)?;
        let up: UpVector = serde_json::from_str(&text)?;
        let direction = up.direction();
        if !direction.iter().all(|c| c.is_finite()) || direction.norm() == 0.0 {
            return Err(UpVectorError::NotFinite(up.estimated_up_direction));
        }
        Ok(up)
    }

    pub fn direction(&self) -> Vector3<f64> {
        Vector3::from(self.estimated_up_direction)
    }
}

/// True when the up direction produced by `transform` (its third column)
/// points against the estimated up direction.
pub fn is_upside_down(up: &UpVector, transform: &Matrix4<f64>) -> bool {
    let real_up = linear_part(transform).column(2).into_owned();
    up.direction().dot(&real_up) < 0.0
}

/// [`is_upside_down`] reading the up vector from `path`. No path, or a file
/// that cannot be read or decoded, answers `false`.
pub fn is_upside_down_from_file(path: Option<&Path>, transform: &Matrix4<f64>) -> bool {
    let Some(path) = path else {
        return false;
    };
    match UpVector::from_path(path) {
        Ok(up) => is_upside_down(&up, transform),
        Err(err) => {
            log::warn!("ignoring up vector file {path:?}: {err}");
            false
        }
    }
}

/// Rotation taking the estimated up direction onto +z.
pub fn upright_rotation(up: &UpVector) -> Matrix4<f64> {
    // None only for opposite directions
    match Rotation3::rotation_between(&up.direction(), &Vector3::z()) {
        Some(rotation) => homogeneous(rotation.matrix(), &Vector3::zeros()),
        None => flip_about_x(),
    }
}
