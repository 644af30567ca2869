use serde::Deserialize;

/// Density clustering neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    pub radius: f64,
    pub min_points: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        ClusterParams {
            radius: 0.1,
            min_points: 250,
        }
    }
}

/// Largest clusters accumulated until they hold `fraction` of all clustered
/// points.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoverageParams {
    pub fraction: f64,
    pub radius: f64,
    pub min_points: usize,
}

impl CoverageParams {
    pub fn new(fraction: f64, radius: f64, min_points: usize) -> Self {
        CoverageParams {
            fraction,
            radius,
            min_points,
        }
    }
}

impl Default for CoverageParams {
    fn default() -> Self {
        CoverageParams::new(0.7, 0.075, 250)
    }
}

/// Angle criterion boundary estimation. Unset radii are derived from the
/// cloud: `search_radius` as 1% of the bounding box diagonal,
/// `normal_search_radius` equal to `search_radius`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CurvatureParams {
    /// Radians.
    pub angle_threshold: f64,
    pub search_radius: Option<f64>,
    pub normal_search_radius: Option<f64>,
}

impl Default for CurvatureParams {
    fn default() -> Self {
        CurvatureParams {
            angle_threshold: std::f64::consts::FRAC_PI_2,
            search_radius: None,
            normal_search_radius: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DrivemapBandParams {
    /// Points higher than this above the lowest drivemap point are dropped.
    pub height: f64,
    /// Half width of the band around the footprint ring.
    pub edge_width: f64,
}

impl Default for DrivemapBandParams {
    fn default() -> Self {
        DrivemapBandParams {
            height: 1.0,
            edge_width: 0.25,
        }
    }
}

/// Boundary of the dominant object of a scan, see
/// [`crate::BoundaryExtractor::boundary_of_center_object`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CenterObjectParams {
    pub downsample: Option<f64>,
    pub seed: Option<u64>,
    pub main_object: CoverageParams,
    pub curvature: CurvatureParams,
    pub flatten_percentile: f64,
    pub footprint: CoverageParams,
    pub voxel_size: f64,
}

impl Default for CenterObjectParams {
    fn default() -> Self {
        CenterObjectParams {
            downsample: None,
            seed: None,
            main_object: CoverageParams::new(0.7, 0.075, 250),
            curvature: CurvatureParams {
                search_radius: Some(0.1),
                normal_search_radius: Some(0.1),
                ..CurvatureParams::default()
            },
            flatten_percentile: 2.0,
            footprint: CoverageParams::new(0.5, 0.1, 10),
            voxel_size: 0.1,
        }
    }
}
