//! Training signals built from one group of samples

use ml_warehouse_core::{Frame, Metadata, Sample};

/// The payload handed to a learner for one batch
///
/// A batch with exactly one real sample is passed unwrapped; larger
/// batches carry index-aligned frames and metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// A single sample
    Single {
        /// The sample's dataset
        frame: Frame,
        /// The sample's metadata
        metadata: Metadata,
    },

    /// Several samples as parallel sequences
    Batch {
        /// Datasets in batch order
        frames: Vec<Frame>,
        /// Metadata, index-aligned with `frames`
        metadata: Vec<Metadata>,
    },
}

impl Signal {
    /// Build a signal from the real entries of a group
    ///
    /// Returns `None` when the group holds no real entry.
    pub fn from_group(group: Vec<Option<Sample>>) -> Option<Self> {
        let mut samples: Vec<Sample> = group.into_iter().flatten().collect();
        match samples.len() {
            0 => None,
            1 => samples.pop().map(|sample| Signal::Single {
                frame: sample.frame,
                metadata: sample.metadata,
            }),
            _ => {
                let (frames, metadata) = samples.into_iter().map(|s| (s.frame, s.metadata)).unzip();
                Some(Signal::Batch { frames, metadata })
            }
        }
    }

    /// Number of samples carried
    pub fn len(&self) -> usize {
        match self {
            Signal::Single { .. } => 1,
            Signal::Batch { frames, .. } => frames.len(),
        }
    }

    /// Check whether the signal carries no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check for the unwrapped single-sample shape
    pub fn is_single(&self) -> bool {
        matches!(self, Signal::Single { .. })
    }

    /// Datasets in batch order
    pub fn frames(&self) -> Vec<&Frame> {
        match self {
            Signal::Single { frame, .. } => vec![frame],
            Signal::Batch { frames, .. } => frames.iter().collect(),
        }
    }

    /// Metadata in batch order
    pub fn metadata(&self) -> Vec<&Metadata> {
        match self {
            Signal::Single { metadata, .. } => vec![metadata],
            Signal::Batch { metadata, .. } => metadata.iter().collect(),
        }
    }
}

impl From<Sample> for Signal {
    fn from(sample: Sample) -> Self {
        Signal::Single {
            frame: sample.frame,
            metadata: sample.metadata,
        }
    }
}
