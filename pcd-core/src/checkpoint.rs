use crate::pointcloud::point::PointCloud;

/// Receives intermediate clouds at named points of a run
/// (`initial`, `mainobject`, `coarse`).
pub trait CheckpointHook {
    fn checkpoint(&mut self, name: &str, point_cloud: &PointCloud);
}

pub struct NoCheckpoints;

impl CheckpointHook for NoCheckpoints {
    fn checkpoint(&mut self, _name: &str, _point_cloud: &PointCloud) {}
}
