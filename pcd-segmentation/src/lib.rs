//! Spatial clustering and boundary extraction for scanned objects.

pub mod boundary;
pub mod cluster;
pub mod dbscan;
pub mod normals;
pub mod params;
pub mod spatial;

pub use boundary::{AngleCriterionEstimator, BoundaryEstimator, BoundaryExtractor};
pub use cluster::ClusterExtractor;
pub use dbscan::{ClusteringEngine, Dbscan};
