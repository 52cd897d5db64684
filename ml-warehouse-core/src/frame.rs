//! Frame implementation: an ordered 2-D dataset of named, typed columns

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::column::{Column, Scalar};
use crate::error::{Error, Result};
use crate::schema::Schema;

/// A collection of equally long, uniquely named columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<Column>,
    row_count: usize,
}

impl Frame {
    /// Create a new frame from columns
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate column name '{}'",
                    column.name()
                )));
            }
        }

        let row_count = columns.first().map_or(0, Column::len);
        if let Some(column) = columns.iter().find(|c| c.len() != row_count) {
            return Err(Error::InvalidInput(format!(
                "all columns must have the same length: '{}' has {} rows, expected {}",
                column.name(),
                column.len(),
                row_count
            )));
        }

        Ok(Self { columns, row_count })
    }

    /// Create an empty frame with no columns
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            row_count: 0,
        }
    }

    /// Get the schema of this frame
    pub fn schema(&self) -> Schema {
        Schema::new(self.columns.iter().map(Column::field).collect())
    }

    /// Get the number of rows in this frame
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Get the number of columns in this frame
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if this frame has no rows
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Take ownership of the columns
    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    /// Get the column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Get a single cell
    pub fn value(&self, row: usize, column: &str) -> Result<Scalar<'_>> {
        self.column(column)?
            .get(row)
            .ok_or_else(|| Error::InvalidInput(format!("row {row} out of bounds ({} rows)", self.row_count)))
    }

    /// Project this frame to the given columns, in the given order
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|name| self.column(name.as_ref()).cloned())
            .collect::<Result<Vec<_>>>()?;

        let mut frame = Self::new(columns)?;
        if names.is_empty() {
            frame.row_count = self.row_count;
        }
        Ok(frame)
    }

    /// Keep only the rows whose mask entry is `true`
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.row_count {
            return Err(Error::InvalidInput(format!(
                "row mask has {} entries but frame has {} rows",
                mask.len(),
                self.row_count
            )));
        }

        let columns = self
            .columns
            .iter()
            .map(|c| c.filter(mask))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            columns,
            row_count: mask.iter().filter(|keep| **keep).count(),
        })
    }

    /// Project to the given columns and keep only the masked rows
    pub fn select<S: AsRef<str>>(&self, names: &[S], mask: &[bool]) -> Result<Self> {
        self.select_columns(names)?.filter_rows(mask)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.column_names().join("\t"))?;
        for row in 0..self.row_count {
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|c| c.get(row).map(|s| s.to_string()).unwrap_or_default())
                .collect();
            writeln!(f, "{}", cells.join("\t"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;

    fn sample() -> Frame {
        Frame::new(vec![
            Column::float64("t", vec![Some(0.0), Some(0.1), Some(0.2)]),
            Column::int64("x", vec![Some(1), Some(2), Some(3)]),
            Column::string("label", vec![Some("a"), Some("b"), None]),
        ])
        .unwrap()
    }

    #[test]
    fn test_frame_validation() {
        let mismatched = Frame::new(vec![
            Column::int64("a", vec![Some(1)]),
            Column::int64("b", vec![Some(1), Some(2)]),
        ]);
        assert!(matches!(mismatched, Err(Error::InvalidInput(_))));

        let duplicated = Frame::new(vec![
            Column::int64("a", vec![Some(1)]),
            Column::int64("a", vec![Some(2)]),
        ]);
        assert!(matches!(duplicated, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_select_columns_keeps_requested_order() {
        let frame = sample();
        let projected = frame.select_columns(&["label", "t"]).unwrap();
        assert_eq!(projected.column_names(), vec!["label", "t"]);
        assert_eq!(projected.row_count(), 3);
        assert_eq!(projected.schema().field_by_name("t").unwrap().data_type(), DataType::Float64);

        assert!(matches!(
            frame.select_columns(&["missing"]),
            Err(Error::ColumnNotFound(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_filter_rows() {
        let frame = sample();
        let filtered = frame.select(&["x"], &[false, true, true]).unwrap();
        assert_eq!(filtered.row_count(), 2);
        assert_eq!(filtered.value(0, "x").unwrap(), Scalar::Int64(2));
        assert!(frame.filter_rows(&[true]).is_err());
    }
}
