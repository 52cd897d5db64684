//! Metadata filters and row filters used to select data

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::column::Scalar;
use crate::error::Result;
use crate::frame::Frame;
use crate::metadata::Metadata;
use crate::value::MetaValue;

/// An (inclusive, exclusive) metadata predicate
///
/// A table matches when it carries every inclusive key with an equal value,
/// and no exclusive key whose value is equal to the excluded one. Excluding
/// a key with [`MetaValue::Null`] excludes every table that has the key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaFilter {
    /// Keys that must be present with the given value
    pub inclusive: HashMap<String, MetaValue>,

    /// Keys whose value (or presence, for `Null`) excludes a table
    pub exclusive: HashMap<String, MetaValue>,
}

impl MetaFilter {
    /// A filter matching every table
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter from both constraint sets
    pub fn new(inclusive: HashMap<String, MetaValue>, exclusive: HashMap<String, MetaValue>) -> Self {
        Self {
            inclusive,
            exclusive,
        }
    }

    /// Require `key == value`
    #[must_use]
    pub fn include(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.inclusive.insert(key.into(), value.into());
        self
    }

    /// Reject tables where `key == value`
    #[must_use]
    pub fn exclude(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.exclusive.insert(key.into(), value.into());
        self
    }

    /// Reject tables that carry `key` at all
    #[must_use]
    pub fn exclude_key(self, key: impl Into<String>) -> Self {
        self.exclude(key, MetaValue::Null)
    }

    /// Evaluate the filter against a table's metadata
    pub fn matches(&self, metadata: &Metadata) -> bool {
        matches(metadata, &self.inclusive, &self.exclusive)
    }
}

/// Evaluate an inclusive/exclusive constraint pair against metadata
pub fn matches(
    metadata: &Metadata,
    inclusive: &HashMap<String, MetaValue>,
    exclusive: &HashMap<String, MetaValue>,
) -> bool {
    for (key, value) in inclusive {
        match metadata.get(key) {
            Some(actual) if actual == value => {}
            _ => return false,
        }
    }

    for (key, excluded) in exclusive {
        if let Some(actual) = metadata.get(key) {
            if actual == excluded || excluded.is_null() {
                return false;
            }
        }
    }

    true
}

/// Predicate applied to every cell of one column
pub type CellPredicate = Arc<dyn Fn(Scalar<'_>) -> bool + Send + Sync>;

/// A list of (column, predicate) selectors, AND-combined into a row mask
#[derive(Clone, Default)]
pub struct RowFilter {
    selectors: Vec<(String, CellPredicate)>,
}

impl RowFilter {
    /// Create an empty row filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a selector on `column`
    #[must_use]
    pub fn with<F>(mut self, column: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Scalar<'_>) -> bool + Send + Sync + 'static,
    {
        self.selectors.push((column.into(), Arc::new(predicate)));
        self
    }

    /// Check whether no selectors were added
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Compute the row mask for `frame`
    ///
    /// Rows pass when every selector accepts them; with no selectors every
    /// row passes.
    pub fn create_mask(&self, frame: &Frame) -> Result<Vec<bool>> {
        let mut mask = vec![true; frame.row_count()];
        for (column, predicate) in &self.selectors {
            let column = frame.column(column)?;
            for (keep, cell) in mask.iter_mut().zip(column.iter()) {
                *keep = *keep && predicate(cell);
            }
        }
        Ok(mask)
    }
}

impl fmt::Debug for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowFilter")
            .field("columns", &self.selectors.iter().map(|(c, _)| c).collect::<Vec<_>>())
            .finish()
    }
}

/// Apply an optional column projection and an optional row filter
///
/// With neither, the frame is returned unchanged.
pub fn apply_filter<S: AsRef<str>>(
    frame: &Frame,
    columns: Option<&[S]>,
    row_filter: Option<&RowFilter>,
) -> Result<Frame> {
    let row_filter = row_filter.filter(|f| !f.is_empty());
    let columns = columns.filter(|c| !c.is_empty());

    match (columns, row_filter) {
        (None, None) => Ok(frame.clone()),
        (Some(columns), None) => frame.select_columns(columns),
        (None, Some(row_filter)) => frame.filter_rows(&row_filter.create_mask(frame)?),
        (Some(columns), Some(row_filter)) => frame.select(columns, &row_filter.create_mask(frame)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use test_case::test_case;

    fn metadata() -> Metadata {
        [("subject", MetaValue::from("s1")), ("trial", MetaValue::Int(3))]
            .into_iter()
            .collect()
    }

    #[test_case(MetaFilter::all(), true ; "empty filter matches everything")]
    #[test_case(MetaFilter::all().include("x", 1), false ; "inclusive key missing")]
    #[test_case(MetaFilter::all().include("trial", 4), false ; "inclusive value mismatch")]
    #[test_case(MetaFilter::all().include("trial", 3).include("subject", "s1"), true ; "inclusive match")]
    #[test_case(MetaFilter::all().exclude("x", 1), true ; "exclusive key absent")]
    #[test_case(MetaFilter::all().exclude("trial", 3), false ; "exclusive value match")]
    #[test_case(MetaFilter::all().exclude("trial", 5), true ; "exclusive value mismatch")]
    #[test_case(MetaFilter::all().exclude_key("subject"), false ; "exclusive unset sentinel")]
    #[test_case(MetaFilter::all().include("trial", 3.0), true ; "inclusive float matches int")]
    #[test_case(MetaFilter::all().exclude("trial", 3.0), false ; "exclusive float matches int")]
    #[test_case(MetaFilter::all().include("trial", 3.5), false ; "inclusive fractional float mismatch")]
    #[test_case(MetaFilter::all().include("subject", "s1").exclude_key("trial"), false ; "inclusive pass exclusive fail")]
    fn test_meta_filter_truth_table(filter: MetaFilter, expected: bool) {
        assert_eq!(filter.matches(&metadata()), expected);
    }


    #[test]
    fn test_row_filter_and_projection() {
        let frame = Frame::new(vec![
            Column::int64("x", vec![Some(1), Some(5), Some(9)]),
            Column::float64("y", vec![Some(0.5), Some(1.5), None]),
        ])
        .unwrap();

        let row_filter = RowFilter::new()
            .with("x", |cell| cell.as_f64().is_some_and(|v| v > 2.0))
            .with("y", |cell| !cell.is_null());

        assert_eq!(row_filter.create_mask(&frame).unwrap(), vec![false, true, false]);

        let filtered = apply_filter(&frame, Some(&["y"][..]), Some(&row_filter)).unwrap();
        assert_eq!(filtered.column_names(), vec!["y"]);
        assert_eq!(filtered.row_count(), 1);

        let untouched = apply_filter::<&str>(&frame, None, None).unwrap();
        assert_eq!(untouched, frame);

        let unknown = RowFilter::new().with("z", |_| true);
        assert!(apply_filter::<&str>(&frame, None, Some(&unknown)).is_err());
    }
}
