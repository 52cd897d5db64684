//! Preprocessor capability: transforms frames singly or as an ordered batch

use crate::error::Result;
use crate::frame::Frame;
use crate::value::Options;

/// A pluggable transformation over frames
///
/// Implementations may accumulate state across calls; the warehouse caches
/// one instance per registered method name.
pub trait Preprocessor: Send {
    /// Transform a single frame
    fn preprocess(&mut self, frame: Frame) -> Result<Frame>;

    /// Transform a batch of frames
    ///
    /// The output must have the same length as the input, and output `i`
    /// must correspond to input `i`.
    fn preprocess_batch_ordered(&mut self, frames: Vec<Frame>) -> Result<Vec<Frame>> {
        frames.into_iter().map(|frame| self.preprocess(frame)).collect()
    }

    /// Update the configuration in place
    fn update_settings(&mut self, options: &Options) -> Result<()>;

    /// Current configuration, sufficient to rebuild an equivalent instance
    fn settings(&self) -> Options;
}

impl<P: Preprocessor + ?Sized> Preprocessor for Box<P> {
    fn preprocess(&mut self, frame: Frame) -> Result<Frame> {
        (**self).preprocess(frame)
    }

    fn preprocess_batch_ordered(&mut self, frames: Vec<Frame>) -> Result<Vec<Frame>> {
        (**self).preprocess_batch_ordered(frames)
    }

    fn update_settings(&mut self, options: &Options) -> Result<()> {
        (**self).update_settings(options)
    }

    fn settings(&self) -> Options {
        (**self).settings()
    }
}

/// A chain of preprocessors that can be executed as a single preprocessor
pub struct PreprocessorChain<P> {
    steps: Vec<P>,
}

impl<P> PreprocessorChain<P> {
    /// Create a new chain
    pub fn new(steps: Vec<P>) -> Self {
        Self { steps }
    }
}

impl<P: Preprocessor> Preprocessor for PreprocessorChain<P> {
    fn preprocess(&mut self, frame: Frame) -> Result<Frame> {
        let mut current = frame;
        for step in &mut self.steps {
            current = step.preprocess(current)?;
        }
        Ok(current)
    }

    fn preprocess_batch_ordered(&mut self, frames: Vec<Frame>) -> Result<Vec<Frame>> {
        let mut current = frames;
        for step in &mut self.steps {
            current = step.preprocess_batch_ordered(current)?;
        }
        Ok(current)
    }

    /// Forwards the options to every step
    fn update_settings(&mut self, options: &Options) -> Result<()> {
        for step in &mut self.steps {
            step.update_settings(options)?;
        }
        Ok(())
    }

    /// Merged settings of all steps; later steps win on shared keys
    fn settings(&self) -> Options {
        self.steps.iter().flat_map(Preprocessor::settings).collect()
    }
}
