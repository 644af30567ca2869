pub mod checkpoint;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod pointcloud;

pub use error::{PcdError, Result};
