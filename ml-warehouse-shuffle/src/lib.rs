//! Ordering strategies for the ML warehouse
//!
//! Before samples are grouped into training batches they are reordered by
//! a named strategy. The default is a seeded shuffle, so repeated runs with
//! the same seed see the same batches.

#![warn(missing_docs)]

pub mod registry;
pub mod strategy;

pub use registry::{OrderingRegistry, RANDOM, SORT};
pub use strategy::{OrderingStrategy, RandomOrder, SortByMetadata, DEFAULT_SEED};
