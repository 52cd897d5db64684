//! CSV parser for converting string records to typed columns

use csv::StringRecord;
use ml_warehouse_core::{Column, DataType, Frame};

use crate::error::{Error, Result};

/// Converts string records into a frame, inferring one type per column
///
/// Empty cells are nulls and do not take part in inference. A column whose
/// cells all parse as integers becomes `Int64`, then `Float64`, then
/// `Boolean`; anything else is `String`.
pub struct CsvParser {
    header: Vec<String>,
}

impl CsvParser {
    /// Create a new parser for the given header
    pub fn new(header: Vec<String>) -> Self {
        Self { header }
    }

    /// Parse all records into a frame
    pub fn parse(&self, records: &[StringRecord]) -> Result<Frame> {
        let num_cols = self.header.len();
        for (i, record) in records.iter().enumerate() {
            if record.len() != num_cols {
                return Err(Error::Format(format!(
                    "Record at row {} has {} columns, expected {}",
                    i,
                    record.len(),
                    num_cols
                )));
            }
        }

        let columns = self
            .header
            .iter()
            .enumerate()
            .map(|(col_idx, name)| {
                let cells: Vec<Option<&str>> = records
                    .iter()
                    .map(|r| r.get(col_idx).map(str::trim).filter(|s| !s.is_empty()))
                    .collect();
                Self::parse_column(name, &cells)
            })
            .collect::<Vec<_>>();

        Ok(Frame::new(columns)?)
    }

    /// Infer the data type of a column from its non-null cells
    pub fn infer_data_type(cells: &[Option<&str>]) -> DataType {
        let present: Vec<&str> = cells.iter().flatten().copied().collect();
        if present.is_empty() {
            return DataType::String;
        }
        if present.iter().all(|s| s.parse::<i64>().is_ok()) {
            DataType::Int64
        } else if present.iter().all(|s| s.parse::<f64>().is_ok()) {
            DataType::Float64
        } else if present.iter().all(|s| parse_bool(s).is_some()) {
            DataType::Boolean
        } else {
            DataType::String
        }
    }

    fn parse_column(name: &str, cells: &[Option<&str>]) -> Column {
        match Self::infer_data_type(cells) {
            DataType::Int64 => Column::int64(
                name,
                cells.iter().map(|c| c.and_then(|s| s.parse().ok())).collect(),
            ),
            DataType::Float64 => Column::float64(
                name,
                cells.iter().map(|c| c.and_then(|s| s.parse().ok())).collect(),
            ),
            DataType::Boolean => Column::boolean(name, cells.iter().map(|c| c.and_then(parse_bool)).collect()),
            DataType::String => Column::string(name, cells.to_vec()),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
