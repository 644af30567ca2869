use std::path::Path;

use las::{point::Classification, point::Format, Builder, Transform, Vector, Writer};
use nalgebra::Vector3;

use pcd_core::pointcloud::point::{Point, PointCloud};

use crate::error::ParseError;

/// Coarsest quantization written; also used for clouds without registration.
pub static SCALE_FACTOR: f64 = 0.001;

fn to_las_point(point: &Point, offset: &Vector3<f64>) -> las::Point {
    let attributes = &point.attributes;
    let classification = attributes
        .classification
        .and_then(|c| Classification::new(c).ok())
        .unwrap_or(Classification::Unclassified);

    las::Point {
        x: point.x + offset.x,
        y: point.y + offset.y,
        z: point.z + offset.z,
        intensity: attributes.intensity.unwrap_or(0),
        return_number: attributes.return_number.unwrap_or(0),
        classification,
        scan_angle: attributes.scan_angle.unwrap_or(0.0),
        user_data: attributes.user_data.unwrap_or(0),
        point_source_id: attributes.point_source_id.unwrap_or(0),
        gps_time: Some(attributes.gps_time.unwrap_or(0.0)),
        color: Some(las::Color::new(point.color.r, point.color.g, point.color.b)),
        ..Default::default()
    }
}

/// Writes a cloud in world coordinates.
///
/// The header scale is the cloud's precision, capped at [`SCALE_FACTOR`], and
/// the header offset its registration offset. Unregistered clouds are written
/// with a scale of [`SCALE_FACTOR`] and their bounding box minimum as offset.
pub fn save_las(point_cloud: &PointCloud, path: &Path) -> Result<(), ParseError> {
    let (header_offset, scale) = match point_cloud.metadata.registration {
        Some(registration) => (
            registration.offset,
            registration.precision.min(SCALE_FACTOR),
        ),
        None => (
            point_cloud
                .bounding_box()
                .map(|bb| bb.min)
                .unwrap_or_else(|_| Vector3::zeros()),
            SCALE_FACTOR,
        ),
    };

    let mut builder = Builder::from((1, 2));
    builder.point_format = Format::new(3)?;
    builder.transforms = Vector {
        x: Transform {
            scale,
            offset: header_offset.x,
        },
        y: Transform {
            scale,
            offset: header_offset.y,
        },
        z: Transform {
            scale,
            offset: header_offset.z,
        },
    };
    let header = builder.into_header()?;

    let start = std::time::Instant::now();
    let world_offset = point_cloud.offset();
    let mut writer = Writer::from_path(path, header)?;
    for point in &point_cloud.points {
        writer.write_point(to_las_point(point, &world_offset))?;
    }
    writer.close()?;
    log::info!(
        "wrote {} points to {:?} in {:?}",
        point_cloud.len(),
        path,
        start.elapsed()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use pcd_core::pointcloud::point::Color;

    use super::*;
    use crate::parsers::{las::LasParserProvider, load, ParserProvider as _};

    #[test]
    fn roundtrip_keeps_registration_and_color() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registered.las");

        let mut pc = PointCloud::from_xyz([[0.0, 0.0, 0.0], [1.25, -2.5, 3.0]]);
        pc.points[1].color = Color { r: 1, g: 2, b: 3 };
        pc.points[1].attributes.classification = Some(2);
        pc.register(Vector3::new(1000.0, 2000.0, 10.0), 0.0005);
        save_las(&pc, &path).unwrap();

        let provider = LasParserProvider {
            filenames: vec![path.clone()],
        };
        let loaded = provider.get_parser().parse().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.precision(), 0.0005);
        assert_eq!(loaded.offset(), Vector3::new(1000.0, 2000.0, 10.0));
        assert!((loaded.points[1].x - 1.25).abs() < 1e-9);
        assert!((loaded.points[1].y + 2.5).abs() < 1e-9);
        assert_eq!(loaded.points[1].color, Color { r: 1, g: 2, b: 3 });
        assert_eq!(loaded.points[1].attributes.classification, Some(2));
    }

    #[test]
    fn unregistered_cloud_is_written_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.las");

        let pc = PointCloud::from_xyz([[10.0, 20.0, 30.0], [11.5, 21.0, 30.25]]);
        save_las(&pc, &path).unwrap();

        let loaded = load(&path).unwrap();
        let world = loaded.world_positions();
        assert!((world[0] - Vector3::new(10.0, 20.0, 30.0)).norm() < 1e-6);
        assert!((world[1] - Vector3::new(11.5, 21.0, 30.25)).norm() < 1e-6);
        assert_eq!(loaded.precision(), SCALE_FACTOR);
    }

    #[test]
    fn coarse_precision_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaled.las");

        // unregistered cloud registered with a scale of 2
        let mut pc = PointCloud::from_xyz([[0.0, 0.0, 0.0], [0.1234, 0.5, 0.25]]);
        pc.register(Vector3::new(500.0, 0.0, 0.0), 2.0);
        save_las(&pc, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.precision(), SCALE_FACTOR);
        let world = loaded.world_positions();
        assert!((world[1] - Vector3::new(500.1234, 0.5, 0.25)).norm() < 1e-3);
    }
}
