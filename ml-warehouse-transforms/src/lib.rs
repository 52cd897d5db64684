//! Preprocessing for the ML warehouse
//!
//! The pipeline runs a [`Preprocessor`] over projections of stored tables
//! and registers the results as derived tables, tagged so their lineage can
//! be queried back through metadata filters.

#![warn(missing_docs)]

pub mod pipeline;
pub mod registry;
pub mod scaling;

pub use ml_warehouse_core::{Preprocessor, PreprocessorChain};
pub use pipeline::{apply_preprocessing, PipelineSettings};
pub use registry::{preprocessor_registry, register_builtin, PreprocessorRegistry, MIN_MAX, STANDARDIZE};
pub use scaling::{MinMaxScaler, Standardizer};
