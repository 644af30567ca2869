pub mod error;
pub mod parsers;
pub mod writers;

pub use error::ParseError;
