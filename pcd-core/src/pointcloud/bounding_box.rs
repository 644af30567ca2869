use nalgebra::Vector3;

use crate::error::{PcdError, Result};
use crate::pointcloud::point::Point;

/// Axis-aligned extent of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

impl BoundingBox {
    pub fn new(min: Vector3<f64>, max: Vector3<f64>) -> Self {
        BoundingBox { min, max }
    }

    pub fn from_points(points: &[Point]) -> Result<Self> {
        Self::from_positions(points.iter().map(Point::position))
    }

    pub fn from_positions<I>(positions: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vector3<f64>>,
    {
        let mut iter = positions.into_iter();
        let first = iter.next().ok_or(PcdError::EmptyInput("bounding box"))?;

        let (min, max) = iter.fold((first, first), |(min, max), p| {
            (min.inf(&p), max.sup(&p))
        });
        Ok(BoundingBox { min, max })
    }

    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn center(&self) -> Vector3<f64> {
        (self.min + self.max) / 2.0
    }

    pub fn diagonal(&self) -> f64 {
        self.size().norm()
    }

    /// Box scaled about the coordinate origin.
    pub fn scaled(&self, factor: f64) -> Self {
        let a = self.min * factor;
        let b = self.max * factor;
        BoundingBox {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<BoundingBox min=[{:.3}, {:.3}, {:.3}] max=[{:.3}, {:.3}, {:.3}]>",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}
