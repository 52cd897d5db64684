//! Ordering strategies: total reorderings of samples before batching

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use ml_warehouse_core::{Error, MetaValue, Options, OptionsExt, Result, Sample};

/// A pluggable reordering of samples
///
/// The output must be a permutation of the input.
pub trait OrderingStrategy: Send + Sync {
    /// Reorder `samples` according to `options`
    fn reorder(&self, samples: Vec<Sample>, options: &Options) -> Result<Vec<Sample>>;
}

/// Seed used when the options carry none
pub const DEFAULT_SEED: u64 = 1;

/// Seeded random shuffle
///
/// Option `seed` (default 1) makes the order reproducible; a seed of 0
/// draws the order from entropy instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOrder;

impl OrderingStrategy for RandomOrder {
    fn reorder(&self, mut samples: Vec<Sample>, options: &Options) -> Result<Vec<Sample>> {
        let seed = options.get_u64("seed")?.unwrap_or(DEFAULT_SEED);
        let mut rng = if seed == 0 {
            StdRng::from_entropy()
        } else {
            StdRng::seed_from_u64(seed)
        };
        samples.shuffle(&mut rng);
        debug!(count = samples.len(), seed, "Shuffled samples");
        Ok(samples)
    }
}

/// Stable sort by metadata values
///
/// Option `order_keys` lists the metadata keys compared in turn. Every
/// sample must carry every key.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortByMetadata;

impl OrderingStrategy for SortByMetadata {
    fn reorder(&self, samples: Vec<Sample>, options: &Options) -> Result<Vec<Sample>> {
        let order_keys = options
            .get_str_list("order_keys")?
            .ok_or_else(|| Error::InvalidInput("sort ordering requires 'order_keys'".to_string()))?;

        let mut keyed = samples
            .into_iter()
            .map(|sample| {
                let key = order_keys
                    .iter()
                    .map(|k| {
                        sample.metadata.get(k).cloned().ok_or_else(|| {
                            Error::InvalidInput(format!("sample has no metadata key '{k}' to sort by"))
                        })
                    })
                    .collect::<Result<Vec<MetaValue>>>()?;
                Ok((key, sample))
            })
            .collect::<Result<Vec<_>>>()?;

        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b));
        Ok(keyed.into_iter().map(|(_, sample)| sample).collect())
    }
}

fn compare_keys(a: &[MetaValue], b: &[MetaValue]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}
