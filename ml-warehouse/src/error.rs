//! Error types for warehouse sessions

use thiserror::Error;

/// Error type for the warehouse facade
#[derive(Error, Debug)]
pub enum Error {
    /// Error raised by the store, a loader or a pluggable capability
    #[error(transparent)]
    Core(#[from] ml_warehouse_core::Error),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ingestion stopped partway; `loaded` tables stay in the store
    #[error("Loading stopped after {} tables: {source}", .loaded.len())]
    PartialLoad {
        /// Identifiers bound before the failure, in load order
        loaded: Vec<String>,

        /// The failure that stopped ingestion
        #[source]
        source: Box<Error>,
    },

    /// Snapshot written by an incompatible version
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// Result type for the warehouse facade
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check whether the error reports an unknown identifier or name
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Core(ml_warehouse_core::Error::NotFound(_)) => true,
            Error::PartialLoad { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Identifiers of tables already stored when ingestion failed
    pub fn loaded_ids(&self) -> &[String] {
        match self {
            Error::PartialLoad { loaded, .. } => loaded,
            _ => &[],
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Core(error.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Core(error.into())
    }
}

impl From<bincode::Error> for Error {
    fn from(error: bincode::Error) -> Self {
        Error::Core(error.into())
    }
}

impl From<ml_warehouse_readers::Error> for Error {
    fn from(error: ml_warehouse_readers::Error) -> Self {
        Error::Core(error.into())
    }
}
