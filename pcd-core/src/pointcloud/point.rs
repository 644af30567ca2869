use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pointcloud::bounding_box::BoundingBox;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointAttributes {
    pub intensity: Option<u16>,
    pub return_number: Option<u8>,
    pub classification: Option<u8>,
    pub scan_angle: Option<f32>,
    pub user_data: Option<u8>,
    pub point_source_id: Option<u16>,
    pub gps_time: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

impl Default for Color {
    fn default() -> Self {
        Color {
            r: 65535,
            g: 65535,
            b: 65535,
        }
    }
}

/// Coordinates are local to the owning cloud: world = local + registration
/// offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub color: Color,
    pub attributes: PointAttributes,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Point {
            x,
            y,
            z,
            color: Color::default(),
            attributes: PointAttributes::default(),
        }
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn set_position(&mut self, position: &Vector3<f64>) {
        self.x = position.x;
        self.y = position.y;
        self.z = position.z;
    }
}

/// Placement of a cloud's local coordinates in the world frame.
///
/// `precision` is the physical size of one coordinate unit; registering a
/// scaled cloud multiplies it by the scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub offset: Vector3<f64>,
    pub precision: f64,
}

/// Opaque coordinate reference system tag, e.g. `EPSG:32633`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Srs(pub String);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub registration: Option<Registration>,
    pub srs: Option<Srs>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<Point>,
    pub metadata: Metadata,
}

impl PointCloud {
    pub fn new(points: Vec<Point>) -> Self {
        PointCloud {
            points,
            metadata: Metadata::default(),
        }
    }

    pub fn from_xyz<I>(coords: I) -> Self
    where
        I: IntoIterator<Item = [f64; 3]>,
    {
        Self::new(
            coords
                .into_iter()
                .map(|[x, y, z]| Point::new(x, y, z))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.points.iter().map(Point::position).collect()
    }

    pub fn world_positions(&self) -> Vec<Vector3<f64>> {
        let offset = self.offset();
        self.points.iter().map(|p| p.position() + offset).collect()
    }

    pub fn bounding_box(&self) -> Result<BoundingBox> {
        BoundingBox::from_points(&self.points)
    }

    pub fn is_registered(&self) -> bool {
        self.metadata.registration.is_some()
    }

    pub fn register(&mut self, offset: Vector3<f64>, precision: f64) {
        self.metadata.registration = Some(Registration { offset, precision });
    }

    pub fn copy_registration_from(&mut self, other: &PointCloud) {
        self.metadata.registration = other.metadata.registration;
    }

    /// Registration offset, zero when unregistered.
    pub fn offset(&self) -> Vector3<f64> {
        self.metadata
            .registration
            .map(|r| r.offset)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Registration precision, one when unregistered.
    pub fn precision(&self) -> f64 {
        self.metadata
            .registration
            .map(|r| r.precision)
            .unwrap_or(1.0)
    }

    pub fn force_srs(&mut self, srs: Srs) {
        self.metadata.srs = Some(srs);
    }

    pub fn set_srs_same_as(&mut self, other: &PointCloud) {
        self.metadata.srs = other.metadata.srs.clone();
    }

    /// Subset by index; metadata is copied, not shared.
    pub fn extract_indices(&self, indices: &[usize]) -> PointCloud {
        PointCloud {
            points: indices.iter().map(|&i| self.points[i].clone()).collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// Subset keeping the points whose mask entry is `true`.
    pub fn extract_mask(&self, mask: &[bool]) -> PointCloud {
        debug_assert_eq!(mask.len(), self.points.len());
        PointCloud {
            points: self
                .points
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(p, _)| p.clone())
                .collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// Applies a homogeneous transform to every local coordinate.
    /// Registration metadata is left untouched.
    pub fn transform(&mut self, transform: &Matrix4<f64>) {
        for point in &mut self.points {
            let moved = transform.transform_point(&Point3::new(point.x, point.y, point.z));
            point.set_position(&moved.coords);
        }
    }

    pub fn scale(&mut self, factor: f64) {
        for point in &mut self.points {
            point.x *= factor;
            point.y *= factor;
            point.z *= factor;
        }
    }
}
