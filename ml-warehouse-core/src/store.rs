//! Identifier-keyed registry of tables and their provenance

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::filter::{apply_filter, MetaFilter, RowFilter};
use crate::frame::Frame;
use crate::source::TableLoader;
use crate::table::Table;
use crate::value::MetaValue;
use crate::Sample;

/// Tables keyed by identifier, plus the source each one was ingested from
///
/// Derived tables carry an empty source tag. Iteration follows insertion
/// order. Tables are never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataStore {
    order: Vec<String>,
    tables: HashMap<String, Table>,
    sources: HashMap<String, String>,
}

impl DataStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table through `loader` and bind it under `table_id`
    ///
    /// Returns `Ok(false)` without loading anything when the identifier is
    /// already bound to a table.
    pub fn add_source(
        &mut self,
        table_id: &str,
        source: &str,
        meta_keys: &[String],
        loader: &dyn TableLoader,
    ) -> Result<bool> {
        if !self.check_table_id(table_id, source) {
            return Ok(false);
        }
        let table = loader.load(source, meta_keys)?;
        debug!(table_id, source, "Imported table from source");
        self.bind(table_id, source, table);
        Ok(true)
    }

    /// Bind an already constructed table under `table_id`
    ///
    /// Returns `false` and leaves the store untouched when the identifier is
    /// already bound.
    pub fn add_table(&mut self, table_id: &str, source: &str, table: Table) -> bool {
        if !self.check_table_id(table_id, source) {
            return false;
        }
        self.bind(table_id, source, table);
        true
    }

    /// Add a metadata key to a stored table; existing keys are skipped
    pub fn add_metadata(&mut self, table_id: &str, key: &str, value: MetaValue) -> Result<bool> {
        let table = self
            .tables
            .get_mut(table_id)
            .ok_or_else(|| Error::not_found("table", table_id))?;
        Ok(table.add_metadata(key, value))
    }

    /// Get a table by its identifier
    pub fn get_by_id(&self, table_id: &str) -> Result<&Table> {
        self.tables
            .get(table_id)
            .ok_or_else(|| Error::not_found("table", table_id))
    }

    /// Get all tables matching the filter, in store order
    pub fn get_by_filter(&self, filter: &MetaFilter) -> Vec<&Table> {
        self.iter()
            .filter(|(_, table)| filter.matches(table.metadata()))
            .map(|(_, table)| table)
            .collect()
    }

    /// Get the identifiers of all tables matching the filter, in store order
    pub fn ids_by_filter(&self, filter: &MetaFilter) -> Vec<String> {
        self.iter()
            .filter(|(_, table)| filter.matches(table.metadata()))
            .map(|(id, _)| id.to_string())
            .collect()
    }

    /// Project and row-filter every matching table, keeping its metadata
    ///
    /// Returns the samples in store order. A missing column in any matching
    /// table fails the whole call.
    pub fn collect_samples<S: AsRef<str>>(
        &self,
        filter: &MetaFilter,
        columns: Option<&[S]>,
        row_filter: Option<&RowFilter>,
    ) -> Result<Vec<Sample>> {
        self.get_by_filter(filter)
            .into_iter()
            .map(|table| {
                let frame: Frame = apply_filter(table.frame(), columns, row_filter)?;
                Ok(Sample::new(frame, table.metadata().clone()))
            })
            .collect()
    }

    /// Get the source a table was ingested from (empty for derived tables)
    pub fn source(&self, table_id: &str) -> Option<&str> {
        self.sources.get(table_id).map(String::as_str)
    }

    /// Iterate over `(identifier, table)` pairs in store order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.tables.get(id).map(|t| (id.as_str(), t)))
    }

    /// Identifiers in store order
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Check whether an identifier is bound to a table
    pub fn contains(&self, table_id: &str) -> bool {
        self.tables.contains_key(table_id)
    }

    /// Number of stored tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check whether the store holds no tables
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn bind(&mut self, table_id: &str, source: &str, table: Table) {
        self.order.push(table_id.to_string());
        self.tables.insert(table_id.to_string(), table);
        self.sources.insert(table_id.to_string(), source.to_string());
    }

    fn check_table_id(&self, table_id: &str, source: &str) -> bool {
        if self.tables.contains_key(table_id) {
            warn!(table_id, "Table id is already in use. Skipping import of data");
            return false;
        }
        // A recorded source without a bound table only gets a warning.
        if let Some(previous) = self.sources.get(table_id) {
            if previous != source {
                warn!(
                    table_id,
                    previous_source = %previous,
                    new_source = source,
                    "Table id is already registered with another data source, overwriting"
                );
            }
        }
        true
    }
}
