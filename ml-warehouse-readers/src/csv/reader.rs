//! CSV reader producing warehouse tables

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use ml_warehouse_core::{Frame, Table, TableLoader};
use tracing::debug;

use crate::common::FileFormat;
use crate::error::{Error, Result};
use crate::metadata::SourceMetadata;

use super::parser::CsvParser;

/// Options for CSV reader
#[derive(Debug, Clone)]
pub struct CsvReaderOptions {
    /// Whether the CSV has a header row
    pub has_header: bool,

    /// Delimiter character
    pub delimiter: u8,

    /// Quote character
    pub quote: u8,

    /// Comment character
    pub comment: Option<u8>,

    /// Whether to trim whitespace
    pub trim: bool,

    /// Suffix replacing the `.csv` extension to locate a metadata sidecar
    pub sidecar_suffix: String,
}

impl Default for CsvReaderOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: b'"',
            comment: None,
            trim: true,
            sidecar_suffix: ".meta.json".to_string(),
        }
    }
}

/// CSV reader that decodes a whole source into a single frame
pub struct CsvReader {
    options: CsvReaderOptions,
}

impl CsvReader {
    /// Create a new CSV reader
    pub fn new(options: CsvReaderOptions) -> Self {
        Self { options }
    }

    /// Decode all records from `reader`
    pub fn read_frame<R: Read>(&self, reader: R) -> Result<Frame> {
        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .has_headers(self.options.has_header)
            .comment(self.options.comment)
            .flexible(true);

        if self.options.trim {
            builder.trim(csv::Trim::All);
        }

        let mut reader = builder.from_reader(reader);

        let records = reader.records().collect::<std::result::Result<Vec<StringRecord>, _>>()?;

        let header: Vec<String> = if self.options.has_header {
            reader.headers()?.iter().map(str::to_string).collect()
        } else {
            let width = records.first().map_or(0, StringRecord::len);
            (0..width).map(|i| format!("column_{i}")).collect()
        };

        CsvParser::new(header).parse(&records)
    }

    /// Decode the file at `path`
    pub fn read_path(&self, path: &Path) -> Result<Frame> {
        let file = File::open(path)?;
        self.read_frame(file)
    }
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new(CsvReaderOptions::default())
    }
}

impl TableLoader for CsvReader {
    fn load(&self, locator: &str, meta_keys: &[String]) -> ml_warehouse_core::Result<Table> {
        let path = Path::new(locator);
        if !self.accepts(locator) {
            return Err(Error::Unsupported(format!("{locator} is not a .csv file")).into());
        }

        let available = SourceMetadata::collect(path, &self.options.sidecar_suffix)?;
        let metadata = available.restrict(meta_keys);
        let frame = self.read_path(path)?;

        debug!(
            source = locator,
            rows = frame.row_count(),
            columns = frame.column_count(),
            metadata_keys = metadata.len(),
            "Loaded CSV source"
        );

        Ok(Table::with_metadata(frame, metadata))
    }

    fn accepts(&self, locator: &str) -> bool {
        FileFormat::has_extension(Path::new(locator), "csv")
    }
}
