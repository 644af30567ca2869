use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("LAS error: {0}")]
    Las(#[from] las::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("required attribute '{0}' is missing")]
    MissingField(String),

    #[error("failed to parse '{field}' from {value:?}")]
    InvalidValue { field: String, value: String },

    #[error("no input files given")]
    NoInput,

    #[error("unsupported extension: {0}")]
    UnsupportedExtension(String),
}
