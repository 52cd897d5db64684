//! Metadata values and the option bag handed to pluggable capabilities

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A metadata value attached to a table, or an option value
///
/// `Null` doubles as the "unset" sentinel in exclusive filters: excluding a
/// key with `Null` excludes every table that carries the key at all.
/// Integers and floats compare equal when numerically equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MetaValue {
    /// Unset / missing value
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point
    Float(f64),

    /// UTF-8 string
    Str(String),

    /// Ordered list of values
    List(Vec<MetaValue>),
}

impl PartialEq for MetaValue {
    #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MetaValue::Null, MetaValue::Null) => true,
            (MetaValue::Bool(a), MetaValue::Bool(b)) => a == b,
            (MetaValue::Int(a), MetaValue::Int(b)) => a == b,
            (MetaValue::Float(a), MetaValue::Float(b)) => a == b,
            (MetaValue::Int(i), MetaValue::Float(f)) | (MetaValue::Float(f), MetaValue::Int(i)) => {
                *i as f64 == *f
            }
            (MetaValue::Str(a), MetaValue::Str(b)) => a == b,
            (MetaValue::List(a), MetaValue::List(b)) => a == b,
            _ => false,
        }
    }
}

impl MetaValue {
    /// Check whether this value is the unset sentinel
    pub fn is_null(&self) -> bool {
        matches!(self, MetaValue::Null)
    }

    /// Get the value as a string slice, if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer; floats with no fractional part convert
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Int(i) => Some(*i),
            MetaValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Get the value as a float; integers widen
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Int(i) => Some(*i as f64),
            MetaValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as a list
    pub fn as_list(&self) -> Option<&[MetaValue]> {
        match self {
            MetaValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Convert a JSON value; objects are rejected since metadata is flat
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Ok(match value {
            serde_json::Value::Null => MetaValue::Null,
            serde_json::Value::Bool(b) => MetaValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => MetaValue::Int(i),
                None => MetaValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => MetaValue::Str(s.clone()),
            serde_json::Value::Array(items) => MetaValue::List(
                items.iter().map(MetaValue::from_json).collect::<Result<Vec<_>>>()?,
            ),
            serde_json::Value::Object(_) => {
                return Err(Error::InvalidInput(
                    "nested objects are not supported as metadata values".into(),
                ))
            }
        })
    }

    fn rank(&self) -> u8 {
        match self {
            MetaValue::Null => 0,
            MetaValue::Bool(_) => 1,
            MetaValue::Int(_) | MetaValue::Float(_) => 2,
            MetaValue::Str(_) => 3,
            MetaValue::List(_) => 4,
        }
    }

    /// Total order used when sorting by metadata
    ///
    /// Null < Bool < numbers < Str < List. Integers and floats compare
    /// numerically, NaN sorts after every other number.
    pub fn total_cmp(&self, other: &MetaValue) -> Ordering {
        match (self, other) {
            (MetaValue::Bool(a), MetaValue::Bool(b)) => a.cmp(b),
            (MetaValue::Int(a), MetaValue::Int(b)) => a.cmp(b),
            (MetaValue::Str(a), MetaValue::Str(b)) => a.cmp(b),
            (MetaValue::List(a), MetaValue::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.total_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (a, b) if a.rank() == 2 && b.rank() == 2 => {
                let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                x.total_cmp(&y)
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Null => write!(f, "null"),
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Int(i) => write!(f, "{i}"),
            MetaValue::Float(x) => write!(f, "{x}"),
            MetaValue::Str(s) => write!(f, "'{s}'"),
            MetaValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Int(value)
    }
}

impl From<i32> for MetaValue {
    fn from(value: i32) -> Self {
        MetaValue::Int(i64::from(value))
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Float(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Str(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Str(value)
    }
}

impl<T: Into<MetaValue>> From<Vec<T>> for MetaValue {
    fn from(value: Vec<T>) -> Self {
        MetaValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(MetaValue::Null, Into::into)
    }
}

/// Settings and options passed to preprocessors, learners and strategies
pub type Options = BTreeMap<String, MetaValue>;

/// Typed accessors over an [`Options`] bag
pub trait OptionsExt {
    /// Read an unsigned integer option
    fn get_u64(&self, key: &str) -> Result<Option<u64>>;

    /// Read a floating point option (integers widen)
    fn get_f64(&self, key: &str) -> Result<Option<f64>>;

    /// Read a string option
    fn get_str(&self, key: &str) -> Result<Option<&str>>;

    /// Read a list-of-strings option
    fn get_str_list(&self, key: &str) -> Result<Option<Vec<String>>>;
}

fn wrong_type(key: &str, expected: &str, found: &MetaValue) -> Error {
    Error::TypeMismatch(format!("option '{key}' must be {expected}, found {found}"))
}

impl OptionsExt for Options {
    fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.get(key) {
            None | Some(MetaValue::Null) => Ok(None),
            Some(value) => value
                .as_i64()
                .and_then(|i| u64::try_from(i).ok())
                .map(Some)
                .ok_or_else(|| wrong_type(key, "a non-negative integer", value)),
        }
    }

    fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None | Some(MetaValue::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| wrong_type(key, "a number", value)),
        }
    }

    fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None | Some(MetaValue::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| wrong_type(key, "a string", value)),
        }
    }

    fn get_str_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.get(key) {
            None | Some(MetaValue::Null) => Ok(None),
            Some(MetaValue::Str(s)) => Ok(Some(vec![s.clone()])),
            Some(value @ MetaValue::List(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Some)
                .ok_or_else(|| wrong_type(key, "a list of strings", value)),
            Some(value) => Err(wrong_type(key, "a list of strings", value)),
        }
    }
}
