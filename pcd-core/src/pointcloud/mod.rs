pub mod bounding_box;
pub mod decimation;
pub mod point;
pub mod transform;
