use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpVectorError {
    #[error("failed to read up vector file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode up vector file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("estimated up direction is not a finite non-zero vector: {0:?}")]
    NotFinite([f64; 3]),
}

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("failed to read parameter file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode parameter file {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}
