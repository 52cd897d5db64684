//! Ingestion collaborator: loads a table from a source locator

use crate::error::Result;
use crate::table::Table;

/// Loads a single dataset plus its initial metadata from a source locator
///
/// Loading is all-or-nothing: an error means no table was produced. The
/// returned metadata is restricted to `meta_keys`.
pub trait TableLoader {
    /// Load the table referenced by `locator`
    fn load(&self, locator: &str, meta_keys: &[String]) -> Result<Table>;

    /// Check whether `locator` refers to a source this loader can read
    fn accepts(&self, locator: &str) -> bool;
}
