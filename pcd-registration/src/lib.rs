//! Coarse registration of an object scan onto a footprint or a reference
//! cloud: principal axis alignment followed by a horizontal scale and offset
//! fit.

pub mod error;
pub mod fit;
pub mod params;
pub mod pipeline;
pub mod pose;
pub mod up_vector;

pub use error::{ParamsError, UpVectorError};
pub use fit::OffsetScaleFitter;
pub use params::RegistrationParams;
pub use pipeline::{intersect_polygon_2d, point_in_polygon_2d, Registrar, RegistrationRecord};
pub use pose::{CovarianceEigenSolver, PoseEstimator, PrincipalAxesSolver};
pub use up_vector::{is_upside_down, is_upside_down_from_file, upright_rotation, UpVector};
