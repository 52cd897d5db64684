//! Tables: a frame plus its provenance metadata

use serde::{Deserialize, Serialize};

use crate::frame::Frame;
use crate::metadata::Metadata;
use crate::value::MetaValue;

/// A lineage tag: the metadata key/value added to derived or superseded tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Metadata key
    pub key: String,

    /// Metadata value
    pub value: MetaValue,
}

impl Tag {
    /// Create a new tag
    pub fn new(key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A dataset with ordered, unique-keyed metadata
///
/// Tables carry no identifier of their own; the store assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    frame: Frame,
    metadata: Metadata,
}

impl Table {
    /// Create a table without metadata
    pub fn new(frame: Frame) -> Self {
        Self::with_metadata(frame, Metadata::new())
    }

    /// Create a table with the given metadata
    pub fn with_metadata(frame: Frame, metadata: Metadata) -> Self {
        Self { frame, metadata }
    }

    /// Get the dataset
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Get the metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Add a metadata key; an existing key is left untouched and `false` returned
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> bool {
        self.metadata.insert(key, value)
    }

    /// Add a lineage tag
    pub fn add_tag(&mut self, tag: &Tag) -> bool {
        self.metadata.insert(tag.key.clone(), tag.value.clone())
    }

    /// Build a derived table around `frame`
    ///
    /// The derived table starts from a deep copy of this table's metadata and
    /// additionally carries `mark_new`.
    pub fn derive(&self, frame: Frame, mark_new: &Tag) -> Table {
        let mut derived = Table::with_metadata(frame, self.metadata.clone());
        derived.add_tag(mark_new);
        derived
    }

    /// Split the table into its parts
    pub fn into_parts(self) -> (Frame, Metadata) {
        (self.frame, self.metadata)
    }
}
