//! CSV ingestion
//!
//! Reads a delimited text file into a single frame, inferring one type per
//! column, and attaches metadata derived from the path and an optional
//! JSON sidecar.

mod parser;
mod reader;

pub use parser::CsvParser;
pub use reader::{CsvReader, CsvReaderOptions};
