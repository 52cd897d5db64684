//! Ordered, unique-keyed metadata attached to a table

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::value::MetaValue;

/// Metadata keys in insertion order plus their values
///
/// Every key in the mapping appears exactly once in `keys` and vice versa.
/// Keys are never overwritten: inserting an existing key is skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    keys: Vec<String>,
    values: HashMap<String, MetaValue>,
}

impl Metadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key, returning `false` (and logging) when the key already exists
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> bool {
        let key = key.into();
        if self.values.contains_key(&key) {
            warn!(key = %key, "Did not add metadata key as it already exists");
            return false;
        }
        self.keys.push(key.clone());
        self.values.insert(key, value.into());
        true
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.values.get(key)
    }

    /// Check whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Key/value pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> + '_ {
        self.keys
            .iter()
            .filter_map(move |k| self.values.get(k).map(|v| (k.as_str(), v)))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check whether there are no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Plain mapping view of the values
    pub fn as_map(&self) -> &HashMap<String, MetaValue> {
        &self.values
    }
}

impl<K: Into<String>, V: Into<MetaValue>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (key, value) in iter {
            metadata.insert(key, value);
        }
        metadata
    }
}
