use std::{collections::HashMap, path::Path, path::PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use nalgebra::Vector3;

use pcd_core::geometry::Polygon;
use pcd_core::pointcloud::point::{Color, Point, PointAttributes, PointCloud};

use super::{Parser, ParserProvider};
use crate::error::ParseError;

pub struct CsvParserProvider {
    pub filenames: Vec<PathBuf>,
}

impl ParserProvider for CsvParserProvider {
    fn get_parser(&self) -> Box<dyn Parser> {
        Box::new(CsvParser {
            filenames: self.filenames.clone(),
        })
    }
}

/// Reads delimited text point files into an unregistered cloud.
///
/// A header row names the columns (`x`, `y`, `z`, `r`, `g`, `b`,
/// `intensity`, ...); without one the columns are taken in that order.
pub struct CsvParser {
    pub filenames: Vec<PathBuf>,
}

impl Parser for CsvParser {
    fn parse(&self) -> Result<PointCloud, ParseError> {
        if self.filenames.is_empty() {
            return Err(ParseError::NoInput);
        }

        let mut points = Vec::new();
        for filename in &self.filenames {
            let mut reader = ReaderBuilder::new()
                .has_headers(false)
                .trim(Trim::All)
                .from_path(filename)?;

            let mut records = reader.records();
            let Some(first) = records.next().transpose()? else {
                continue;
            };

            let has_headers = !is_numeric_record(&first);
            let field_mapping = create_field_mapping(&first, has_headers)?;
            if !has_headers {
                points.push(parse_point(&first, &field_mapping)?);
            }
            for record in records {
                points.push(parse_point(&record?, &field_mapping)?);
            }
        }

        Ok(PointCloud::new(points))
    }
}

/// Loads a polygon from rows of `x,y[,z]`; an optional header row is skipped
/// and a missing z is 0.
pub fn load_csv_polygon(path: &Path) -> Result<Polygon, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut vertices = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        if row == 0 && !is_numeric_record(&record) {
            continue;
        }
        let coord = |index: usize, name: &str| -> Result<Option<f64>, ParseError> {
            record
                .get(index)
                .map(|v| parse_value(name, v))
                .transpose()
        };
        let x = coord(0, "x")?.ok_or_else(|| ParseError::MissingField("x".to_string()))?;
        let y = coord(1, "y")?.ok_or_else(|| ParseError::MissingField("y".to_string()))?;
        let z = coord(2, "z")?.unwrap_or(0.0);
        vertices.push(Vector3::new(x, y, z));
    }

    log::debug!("read {} polygon vertices from {:?}", vertices.len(), path);
    Ok(Polygon::new(vertices))
}

fn is_numeric_record(record: &StringRecord) -> bool {
    record.iter().all(|f| f.parse::<f64>().is_ok())
}

fn parse_value<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ParseError> {
    value.parse::<T>().map_err(|_| ParseError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

const ATTRIBUTE_NAMES: [&str; 13] = [
    "x",
    "y",
    "z",
    "r",
    "g",
    "b",
    "intensity",
    "return_number",
    "classification",
    "scan_angle",
    "user_data",
    "point_source_id",
    "gps_time",
];

fn create_field_mapping(
    headers: &StringRecord,
    has_headers: bool,
) -> Result<HashMap<&'static str, usize>, ParseError> {
    let mut mapping = HashMap::new();

    if has_headers {
        for (index, header) in headers.iter().enumerate() {
            let normalized_header = header.to_lowercase().replace(['_', '-'], "");
            let normalized_header = match normalized_header.as_str() {
                "red" => "r".to_string(),
                "green" => "g".to_string(),
                "blue" => "b".to_string(),
                _ => normalized_header,
            };
            if let Some(attr_name) = ATTRIBUTE_NAMES
                .iter()
                .find(|attr| attr.replace('_', "") == normalized_header)
            {
                mapping.insert(*attr_name, index);
            }
        }
    } else {
        for (index, attr_name) in ATTRIBUTE_NAMES.iter().enumerate().take(headers.len()) {
            mapping.insert(*attr_name, index);
        }
    }

    for attr_name in ["x", "y", "z"] {
        if !mapping.contains_key(attr_name) {
            return Err(ParseError::MissingField(attr_name.to_string()));
        }
    }

    Ok(mapping)
}

fn get_field_value<'a>(
    record: &'a StringRecord,
    field_mapping: &HashMap<&'static str, usize>,
    field_name: &str,
) -> Option<&'a str> {
    field_mapping
        .get(field_name)
        .and_then(|&index| record.get(index))
        .filter(|v| !v.is_empty())
}

fn parse_optional_field<T: std::str::FromStr>(
    record: &StringRecord,
    field_mapping: &HashMap<&'static str, usize>,
    field_name: &str,
) -> Result<Option<T>, ParseError> {
    get_field_value(record, field_mapping, field_name)
        .map(|v| parse_value(field_name, v))
        .transpose()
}

fn parse_required_field(
    record: &StringRecord,
    field_mapping: &HashMap<&'static str, usize>,
    field_name: &str,
) -> Result<f64, ParseError> {
    parse_optional_field(record, field_mapping, field_name)?
        .ok_or_else(|| ParseError::MissingField(field_name.to_string()))
}

fn parse_point(
    record: &StringRecord,
    field_mapping: &HashMap<&'static str, usize>,
) -> Result<Point, ParseError> {
    let x = parse_required_field(record, field_mapping, "x")?;
    let y = parse_required_field(record, field_mapping, "y")?;
    let z = parse_required_field(record, field_mapping, "z")?;

    let channel = |name: &str| -> Result<u16, ParseError> {
        Ok(parse_optional_field::<f64>(record, field_mapping, name)?
            .map(|v| v.floor() as u16)
            .unwrap_or(65535))
    };
    let color = Color {
        r: channel("r")?,
        g: channel("g")?,
        b: channel("b")?,
    };

    let attributes = PointAttributes {
        intensity: parse_optional_field(record, field_mapping, "intensity")?,
        return_number: parse_optional_field(record, field_mapping, "return_number")?,
        classification: parse_optional_field(record, field_mapping, "classification")?,
        scan_angle: parse_optional_field(record, field_mapping, "scan_angle")?,
        user_data: parse_optional_field(record, field_mapping, "user_data")?,
        point_source_id: parse_optional_field(record, field_mapping, "point_source_id")?,
        gps_time: parse_optional_field(record, field_mapping, "gps_time")?,
    };

    Ok(Point {
        x,
        y,
        z,
        color,
        attributes,
    })
}
