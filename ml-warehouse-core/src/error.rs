//! Error types for the ML warehouse

use std::io;
use thiserror::Error;

/// Result type for warehouse operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for warehouse operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A table, preprocessor, learner, strategy or session was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input (wrong source kind, malformed argument, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A requested column does not exist in the frame
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Data type mismatch
    #[error("Data type mismatch: {0}")]
    TypeMismatch(String),

    /// A pluggable capability broke its contract
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// A name was registered twice in a registry
    #[error("Duplicate registration: {0}")]
    DuplicateRegistration(String),

    /// Snapshot encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure raised inside a preprocessor, learner or strategy
    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] naming the kind of thing looked up
    pub fn not_found(kind: &str, name: &str) -> Self {
        Error::NotFound(format!("{kind} '{name}'"))
    }
}
