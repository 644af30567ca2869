use std::path::Path;

use pcd_core::pointcloud::point::PointCloud;

use crate::error::ParseError;

pub mod csv;
pub mod las;

pub trait ParserProvider {
    fn get_parser(&self) -> Box<dyn Parser>;
}

pub trait Parser {
    fn parse(&self) -> Result<PointCloud, ParseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Las,
    Laz,
    Csv,
    Txt,
}

pub fn get_extension(extension: &str) -> Result<Extension, ParseError> {
    match extension.to_ascii_lowercase().as_str() {
        "las" => Ok(Extension::Las),
        "laz" => Ok(Extension::Laz),
        "csv" => Ok(Extension::Csv),
        "txt" => Ok(Extension::Txt),
        other => Err(ParseError::UnsupportedExtension(other.to_string())),
    }
}

/// Loads a point cloud, picking the parser from the file extension.
pub fn load(path: &Path) -> Result<PointCloud, ParseError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ParseError::UnsupportedExtension(path.display().to_string()))?;

    let filenames = vec![path.to_path_buf()];
    let provider: Box<dyn ParserProvider> = match get_extension(extension)? {
        Extension::Las | Extension::Laz => Box::new(las::LasParserProvider { filenames }),
        Extension::Csv | Extension::Txt => Box::new(csv::CsvParserProvider { filenames }),
    };
    provider.get_parser().parse()
}
