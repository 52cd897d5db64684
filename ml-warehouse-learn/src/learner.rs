//! Learner capability and its registry

use std::collections::BTreeMap;

use tracing::debug;

use ml_warehouse_core::{Error, MetaValue, Options, OptionsExt, Registry, Result};

use crate::signal::Signal;

/// Result of a learn or predict call
pub type Statistics = Options;

/// A pluggable model trained batch by batch
pub trait Learner: Send {
    /// Train on one signal
    fn learn(&mut self, signal: &Signal, options: &Options) -> Result<Statistics>;

    /// Respond to a signal without training
    fn predict(&self, signal: &Signal, options: &Options) -> Result<Statistics>;

    /// Current configuration and state, sufficient to rebuild an
    /// equivalent instance through the registry
    fn settings(&self) -> Options;
}

/// Learners keyed by name
pub type LearnerRegistry = Registry<dyn Learner>;

/// Name of the running-mean learner
pub const RUNNING_MEAN: &str = "running_mean";

/// Create an empty learner registry
pub fn learner_registry() -> LearnerRegistry {
    Registry::new("learner")
}

/// Register the built-in learners
pub fn register_builtin(registry: &mut LearnerRegistry) -> Result<()> {
    registry.register(RUNNING_MEAN, |options: &Options| {
        Ok(Box::new(RunningMean::from_settings(options)?) as Box<dyn Learner>)
    })
}

/// Tracks the mean of every numeric column seen so far
///
/// `predict` reports the learned means as `mean.<column>`; with option
/// `columns` only the listed columns are reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningMean {
    sums: BTreeMap<String, f64>,
    counts: BTreeMap<String, u64>,
    batches: u64,
}

impl RunningMean {
    /// Create an untrained learner
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from settings produced by [`Learner::settings`]
    pub fn from_settings(options: &Options) -> Result<Self> {
        let mut learner = Self::new();
        for key in options.keys() {
            if let Some(column) = key.strip_prefix("sum.") {
                let sum = options.get_f64(key)?.unwrap_or_default();
                learner.sums.insert(column.to_string(), sum);
            } else if let Some(column) = key.strip_prefix("count.") {
                let count = options.get_u64(key)?.unwrap_or_default();
                learner.counts.insert(column.to_string(), count);
            } else if key == "batches" {
                learner.batches = options.get_u64(key)?.unwrap_or_default();
            } else {
                return Err(Error::InvalidInput(format!("unknown running_mean setting '{key}'")));
            }
        }
        Ok(learner)
    }

    /// Learned mean of a column
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self, column: &str) -> Option<f64> {
        let count = *self.counts.get(column)?;
        if count == 0 {
            return None;
        }
        self.sums.get(column).map(|sum| sum / count as f64)
    }
}

impl Learner for RunningMean {
    fn learn(&mut self, signal: &Signal, _options: &Options) -> Result<Statistics> {
        let mut rows = 0;
        for frame in signal.frames() {
            rows += frame.row_count();
            for column in frame.columns().iter().filter(|c| c.data_type().is_numeric()) {
                let values: Vec<f64> = column.to_f64()?.into_iter().flatten().collect();
                *self.sums.entry(column.name().to_string()).or_default() += values.iter().sum::<f64>();
                *self.counts.entry(column.name().to_string()).or_default() += values.len() as u64;
            }
        }
        self.batches += 1;
        debug!(batch = self.batches, samples = signal.len(), rows, "Learned batch");

        Ok([
            ("batch".to_string(), MetaValue::from(i64::try_from(self.batches).unwrap_or(i64::MAX))),
            ("samples".to_string(), MetaValue::from(i64::try_from(signal.len()).unwrap_or(i64::MAX))),
            ("rows".to_string(), MetaValue::from(i64::try_from(rows).unwrap_or(i64::MAX))),
        ]
        .into_iter()
        .collect())
    }

    fn predict(&self, _signal: &Signal, options: &Options) -> Result<Statistics> {
        let columns = match options.get_str_list("columns")? {
            Some(columns) => columns,
            None => self.counts.keys().cloned().collect(),
        };
        Ok(columns
            .into_iter()
            .map(|column| {
                let mean = MetaValue::from(self.mean(&column));
                (format!("mean.{column}"), mean)
            })
            .collect())
    }

    fn settings(&self) -> Options {
        let sums = self
            .sums
            .iter()
            .map(|(column, sum)| (format!("sum.{column}"), MetaValue::Float(*sum)));
        let counts = self.counts.iter().map(|(column, count)| {
            (
                format!("count.{column}"),
                MetaValue::from(i64::try_from(*count).unwrap_or(i64::MAX)),
            )
        });
        let batches = std::iter::once((
            "batches".to_string(),
            MetaValue::from(i64::try_from(self.batches).unwrap_or(i64::MAX)),
        ));
        sums.chain(counts).chain(batches).collect()
    }
}
