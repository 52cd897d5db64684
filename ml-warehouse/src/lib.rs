//! Metadata-tagged table warehouse with lineage-preserving preprocessing
//! and batched learning
//!
//! A [`SystemManager`] owns sessions; each session pairs an optional
//! learner with a [`DataWarehouse`]. Warehouses ingest CSV files into
//! tables tagged with provenance metadata, derive new tables through
//! preprocessors, and feed filtered tables to the learner batch by batch.
//!
//! ```no_run
//! use ml_warehouse::{MetaFilter, Options, Registries, SystemConfig, SystemManager, RUNNING_MEAN};
//!
//! # fn main() -> ml_warehouse::Result<()> {
//! let mut system = SystemManager::with_config("demo", SystemConfig::default(), Registries::builtin()?);
//! let session = system.create_session(Some(RUNNING_MEAN), &Options::new(), "data")?;
//! system.load_data(&session, &["subject_01"], &["source".to_string()])?;
//!
//! let request = system.learning_request(MetaFilter::all());
//! for statistics in system.learn_data(&session, request)? {
//!     println!("{:?}", statistics?);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod warehouse;

pub use config::SystemConfig;
pub use error::{Error, Result};
pub use manager::{PreprocessRequest, Registries, SessionId, SystemManager};
pub use warehouse::{DataWarehouse, WarehouseSnapshot, DATA_EXTENSION};

pub use ml_warehouse_core::{
    Column, DataType, Frame, MetaFilter, MetaValue, Metadata, Options, RowFilter, Sample, Table, Tag,
};
pub use ml_warehouse_learn::{Learner, LearningRequest, LearningRun, Signal, Statistics, RUNNING_MEAN};
pub use ml_warehouse_readers::CsvReaderOptions;
pub use ml_warehouse_shuffle::{OrderingStrategy, RANDOM, SORT};
pub use ml_warehouse_transforms::{PipelineSettings, Preprocessor, MIN_MAX, STANDARDIZE};
