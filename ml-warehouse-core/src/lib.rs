//! Core data structures for the ML warehouse
//!
//! This crate provides tables (a frame plus provenance metadata), the
//! metadata filter that selects them, and the identifier-keyed store that
//! owns them. It also defines the ingestion and preprocessing capabilities
//! that the other crates implement.

#![warn(missing_docs)]

pub mod column;
pub mod error;
pub mod filter;
pub mod frame;
pub mod metadata;
pub mod registry;
pub mod schema;
pub mod source;
pub mod store;
pub mod table;
pub mod transform;
pub mod value;

// Re-export key types for convenience
pub use column::{Column, ColumnData, Scalar};
pub use error::{Error, Result};
pub use filter::{apply_filter, MetaFilter, RowFilter};
pub use frame::Frame;
pub use metadata::Metadata;
pub use registry::{Factory, Registry};
pub use schema::{DataType, Field, Schema};
pub use source::TableLoader;
pub use store::DataStore;
pub use table::{Table, Tag};
pub use transform::{Preprocessor, PreprocessorChain};
pub use value::{MetaValue, Options, OptionsExt};

/// A frame paired with the metadata of the table it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// The (projected, row-filtered) dataset
    pub frame: Frame,

    /// Metadata of the originating table
    pub metadata: Metadata,
}

impl Sample {
    /// Create a new sample
    pub fn new(frame: Frame, metadata: Metadata) -> Self {
        Self { frame, metadata }
    }
}
