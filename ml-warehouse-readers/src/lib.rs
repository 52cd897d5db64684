//! Source loaders for the ML warehouse
//!
//! This crate implements the ingestion collaborator: it turns a source
//! locator into a table, and discovers sources inside data folders.

mod error;
mod metadata;

pub mod common;
pub mod csv;

pub use common::{discover_sources, FileFormat};
pub use self::csv::{CsvReader, CsvReaderOptions};
pub use error::{Error, Result};
pub use metadata::SourceMetadata;
