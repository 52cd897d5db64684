//! Error types for source loaders

use thiserror::Error;

/// Error type for source loaders
#[derive(Error, Debug)]
pub enum Error {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] ml_warehouse_core::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV format error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON format error in a metadata sidecar
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Format error
    #[error("Format error: {0}")]
    Format(String),

    /// Source kind not supported by this loader
    #[error("Unsupported source: {0}")]
    Unsupported(String),
}

/// Result type for source loaders
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for ml_warehouse_core::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Core(e) => e,
            Error::Io(e) => ml_warehouse_core::Error::Io(e),
            Error::Json(e) => ml_warehouse_core::Error::Json(e),
            other => ml_warehouse_core::Error::InvalidInput(other.to_string()),
        }
    }
}
