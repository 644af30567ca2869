use std::path::Path;

use serde::Deserialize;

use pcd_segmentation::params::{
    CenterObjectParams, ClusterParams, CurvatureParams, DrivemapBandParams,
};

use crate::error::ParamsError;

/// Tunables of every registration stage. Missing keys keep their defaults,
/// so a parameter file only needs to name what it changes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegistrationParams {
    /// Main object of `register_from_footprint` / `register_from_reference`.
    pub cluster: ClusterParams,
    pub curvature: CurvatureParams,
    pub center_object: CenterObjectParams,
    pub drivemap_band: DrivemapBandParams,
}

impl RegistrationParams {
    pub fn from_json_path(path: &Path) -> Result<Self, ParamsError> {
        let text = std::fs::read_to_string(path).map_err(|source| ParamsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ParamsError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
