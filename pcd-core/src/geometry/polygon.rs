use geo::{Contains, EuclideanDistance, LineString};
use nalgebra::Vector3;

use crate::error::Result;
use crate::pointcloud::bounding_box::BoundingBox;

/// Closed ring of vertices in world coordinates. Containment and distance
/// queries only look at x and y.
///
/// Points exactly on the ring are not contained.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vector3<f64>>,
    outline: geo::Polygon<f64>,
}

impl Polygon {
    pub fn new(vertices: Vec<Vector3<f64>>) -> Self {
        let ring: LineString<f64> = vertices.iter().map(|v| (v.x, v.y)).collect();
        Polygon {
            outline: geo::Polygon::new(ring, vec![]),
            vertices,
        }
    }

    pub fn from_xy<I>(coords: I) -> Self
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        Self::new(
            coords
                .into_iter()
                .map(|[x, y]| Vector3::new(x, y, 0.0))
                .collect(),
        )
    }

    pub fn vertices(&self) -> &[Vector3<f64>] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn bounding_box(&self) -> Result<BoundingBox> {
        BoundingBox::from_positions(self.vertices.iter().copied())
    }

    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        self.vertices.len() >= 3 && self.outline.contains(&geo::Point::new(x, y))
    }

    /// Planar distance from (x, y) to the closed ring.
    pub fn ring_distance_xy(&self, x: f64, y: f64) -> f64 {
        let p = geo::Point::new(x, y);
        match self.vertices.len() {
            0 => f64::INFINITY,
            1 => p.euclidean_distance(&geo::Point::new(self.vertices[0].x, self.vertices[0].y)),
            _ => p.euclidean_distance(self.outline.exterior()),
        }
    }

    /// Vertices scaled by `factor` about their mean.
    pub fn scaled_about_mean(&self, factor: f64) -> Polygon {
        if self.vertices.is_empty() {
            return self.clone();
        }
        let mean = self.vertices.iter().sum::<Vector3<f64>>() / self.vertices.len() as f64;
        Polygon::new(
            self.vertices
                .iter()
                .map(|v| (v - mean) * factor + mean)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::from_xy([[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]])
    }

    #[test]
    fn containment() {
        let poly = square();
        assert!(poly.contains_xy(1.0, 1.0));
        assert!(poly.contains_xy(0.1, 1.9));
        assert!(!poly.contains_xy(3.0, 1.0));
        assert!(!poly.contains_xy(-0.5, -0.5));
    }

    #[test]
    fn ring_points_are_outside_on_every_edge() {
        let poly = square();
        for (x, y) in [
            (0.0, 1.0),
            (2.0, 1.0),
            (1.0, 0.0),
            (1.0, 2.0),
            (0.0, 0.0),
            (2.0, 2.0),
        ] {
            assert!(!poly.contains_xy(x, y), "({x}, {y})");
            assert!(poly.ring_distance_xy(x, y) < 1e-12);
        }
    }

    #[test]
    fn concave_containment() {
        // U shape open to the top
        let poly = Polygon::from_xy([
            [0.0, 0.0],
            [3.0, 0.0],
            [3.0, 3.0],
            [2.0, 3.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 3.0],
            [0.0, 3.0],
        ]);
        assert!(poly.contains_xy(0.5, 2.0));
        assert!(poly.contains_xy(2.5, 2.0));
        assert!(!poly.contains_xy(1.5, 2.0));
        assert!(poly.contains_xy(1.5, 0.5));
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let poly = Polygon::from_xy([[0.0, 0.0], [1.0, 1.0]]);
        assert!(!poly.contains_xy(0.5, 0.5));
        assert_eq!(Polygon::new(vec![]).ring_distance_xy(0.0, 0.0), f64::INFINITY);
        assert_eq!(Polygon::from_xy([[3.0, 4.0]]).ring_distance_xy(0.0, 0.0), 5.0);
    }

    #[test]
    fn ring_distance_includes_closing_edge() {
        let poly = square();
        assert!((poly.ring_distance_xy(1.0, 1.0) - 1.0).abs() < 1e-12);
        assert!((poly.ring_distance_xy(-0.5, 1.0) - 0.5).abs() < 1e-12);
        assert!((poly.ring_distance_xy(3.0, 3.0) - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn scaling_about_mean() {
        let poly = square().scaled_about_mean(2.0);
        assert_eq!(poly.vertices()[0], Vector3::new(-1.0, -1.0, 0.0));
        assert_eq!(poly.vertices()[2], Vector3::new(3.0, 3.0, 0.0));
        assert!(poly.contains_xy(-0.5, 2.5));
    }
}
