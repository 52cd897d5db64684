//! Column implementation for storing typed, nullable vectors of data

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{DataType, Field};

/// Typed storage behind a column; `None` cells are nulls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    /// Boolean values
    Boolean(Vec<Option<bool>>),

    /// 64-bit signed integers
    Int64(Vec<Option<i64>>),

    /// 64-bit floats
    Float64(Vec<Option<f64>>),

    /// UTF-8 strings
    String(Vec<Option<String>>),
}

impl ColumnData {
    /// Get the data type of this storage
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Boolean(_) => DataType::Boolean,
            ColumnData::Int64(_) => DataType::Int64,
            ColumnData::Float64(_) => DataType::Float64,
            ColumnData::String(_) => DataType::String,
        }
    }

    /// Get the number of cells
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::String(v) => v.len(),
        }
    }

    /// Check whether there are no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Borrowed view of a single cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    /// Null cell
    Null,

    /// Boolean cell
    Boolean(bool),

    /// Integer cell
    Int64(i64),

    /// Float cell
    Float64(f64),

    /// String cell
    String(&'a str),
}

impl Scalar<'_> {
    /// Check whether the cell is null
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Numeric value of the cell, if any
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int64(i) => Some(*i as f64),
            Scalar::Float64(f) => Some(*f),
            _ => None,
        }
    }

    /// String value of the cell, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Boolean(b) => write!(f, "{b}"),
            Scalar::Int64(i) => write!(f, "{i}"),
            Scalar::Float64(x) => write!(f, "{x}"),
            Scalar::String(s) => write!(f, "{s}"),
        }
    }
}

/// A named column of data with a specific type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    /// Create a new column with the given name and data
    pub fn new(name: &str, data: ColumnData) -> Self {
        Self {
            name: name.to_string(),
            data,
        }
    }

    /// Create a boolean column
    pub fn boolean(name: &str, values: Vec<Option<bool>>) -> Self {
        Self::new(name, ColumnData::Boolean(values))
    }

    /// Create an integer column
    pub fn int64(name: &str, values: Vec<Option<i64>>) -> Self {
        Self::new(name, ColumnData::Int64(values))
    }

    /// Create a float column
    pub fn float64(name: &str, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnData::Float64(values))
    }

    /// Create a string column
    pub fn string<S: Into<String>>(name: &str, values: Vec<Option<S>>) -> Self {
        Self::new(
            name,
            ColumnData::String(values.into_iter().map(|v| v.map(Into::into)).collect()),
        )
    }

    /// Get the name of this column
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the data type of this column
    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// Get the schema field describing this column
    pub fn field(&self) -> Field {
        Field::new(&self.name, self.data_type())
    }

    /// Get the typed storage
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Take the typed storage
    pub fn into_data(self) -> ColumnData {
        self.data
    }

    /// Get the length of this column (number of values)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if this column is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of null values in this column
    pub fn null_count(&self) -> usize {
        match &self.data {
            ColumnData::Boolean(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Int64(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Float64(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::String(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Get a cell, or `None` when the index is out of bounds
    pub fn get(&self, index: usize) -> Option<Scalar<'_>> {
        let scalar = match &self.data {
            ColumnData::Boolean(v) => v.get(index)?.map_or(Scalar::Null, Scalar::Boolean),
            ColumnData::Int64(v) => v.get(index)?.map_or(Scalar::Null, Scalar::Int64),
            ColumnData::Float64(v) => v.get(index)?.map_or(Scalar::Null, Scalar::Float64),
            ColumnData::String(v) => v
                .get(index)?
                .as_deref()
                .map_or(Scalar::Null, Scalar::String),
        };
        Some(scalar)
    }

    /// Iterate over all cells
    pub fn iter(&self) -> impl Iterator<Item = Scalar<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Numeric cells widened to `f64`
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> Result<Vec<Option<f64>>> {
        match &self.data {
            ColumnData::Int64(v) => Ok(v.iter().map(|c| c.map(|i| i as f64)).collect()),
            ColumnData::Float64(v) => Ok(v.clone()),
            other => Err(Error::TypeMismatch(format!(
                "column '{}' is {}, expected a numeric column",
                self.name,
                other.data_type()
            ))),
        }
    }

    /// Keep only the rows whose mask entry is `true`
    pub fn filter(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.len() {
            return Err(Error::InvalidInput(format!(
                "row mask has {} entries but column '{}' has {} rows",
                mask.len(),
                self.name,
                self.len()
            )));
        }

        fn keep<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(v, _)| v.clone())
                .collect()
        }

        let data = match &self.data {
            ColumnData::Boolean(v) => ColumnData::Boolean(keep(v, mask)),
            ColumnData::Int64(v) => ColumnData::Int64(keep(v, mask)),
            ColumnData::Float64(v) => ColumnData::Float64(keep(v, mask)),
            ColumnData::String(v) => ColumnData::String(keep(v, mask)),
        };

        Ok(Self::new(&self.name, data))
    }
}
