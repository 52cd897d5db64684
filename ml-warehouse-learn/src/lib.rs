//! Learning orchestration for the ML warehouse
//!
//! A [`LearningRun`] selects samples from the store, reorders them with a
//! named strategy, groups them into fixed-size batches and hands one
//! [`Signal`] per batch to a [`Learner`]. Batches are produced on demand.

#![warn(missing_docs)]

pub mod grouping;
pub mod learner;
pub mod run;
pub mod signal;

pub use grouping::{padded_chunks, PaddedChunks};
pub use learner::{learner_registry, register_builtin, Learner, LearnerRegistry, RunningMean, Statistics, RUNNING_MEAN};
pub use run::{LearningRequest, LearningRun};
pub use signal::Signal;
