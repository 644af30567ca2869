use std::path::PathBuf;

use las::Reader;
use nalgebra::Vector3;

use pcd_core::pointcloud::point::{Color, Point, PointAttributes, PointCloud};

use super::{Parser, ParserProvider};
use crate::error::ParseError;

pub struct LasParserProvider {
    pub filenames: Vec<PathBuf>,
}

impl ParserProvider for LasParserProvider {
    fn get_parser(&self) -> Box<dyn Parser> {
        Box::new(LasParser {
            filenames: self.filenames.clone(),
        })
    }
}

/// Reads one or more LAS/LAZ files into a single registered cloud.
///
/// The first file's header offset and x scale become the cloud's registration
/// offset and precision; points are stored relative to that offset.
pub struct LasParser {
    pub filenames: Vec<PathBuf>,
}

fn convert_las_point(las_point: &las::Point, offset: &Vector3<f64>) -> Point {
    let color = las_point
        .color
        .map(|c| Color {
            r: c.red,
            g: c.green,
            b: c.blue,
        })
        .unwrap_or_default();

    let attributes = PointAttributes {
        intensity: Some(las_point.intensity),
        return_number: Some(las_point.return_number),
        classification: Some(u8::from(las_point.classification)),
        scan_angle: Some(las_point.scan_angle),
        user_data: Some(las_point.user_data),
        point_source_id: Some(las_point.point_source_id),
        gps_time: las_point.gps_time,
    };

    Point {
        x: las_point.x - offset.x,
        y: las_point.y - offset.y,
        z: las_point.z - offset.z,
        color,
        attributes,
    }
}

impl Parser for LasParser {
    fn parse(&self) -> Result<PointCloud, ParseError> {
        let first = self.filenames.first().ok_or(ParseError::NoInput)?;

        let start = std::time::Instant::now();
        let header = Reader::from_path(first)?.header().clone();
        let transforms = header.transforms();
        let offset = Vector3::new(transforms.x.offset, transforms.y.offset, transforms.z.offset);
        let precision = transforms.x.scale;

        let mut points = Vec::with_capacity(header.number_of_points() as usize);
        for filename in &self.filenames {
            let mut reader = Reader::from_path(filename)?;
            for las_point in reader.points() {
                points.push(convert_las_point(&las_point?, &offset));
            }
        }
        log::info!(
            "read {} points from {} LAS file(s) in {:?}",
            points.len(),
            self.filenames.len(),
            start.elapsed()
        );

        let mut point_cloud = PointCloud::new(points);
        point_cloud.register(offset, precision);
        Ok(point_cloud)
    }
}
