//! Lazy, batch-by-batch learning runs

use std::num::NonZeroUsize;
use std::vec;

use tracing::{debug, info};

use ml_warehouse_core::{DataStore, Error, MetaFilter, Options, Result, RowFilter, Sample};
use ml_warehouse_shuffle::{OrderingRegistry, RANDOM};

use crate::grouping::{padded_chunks, PaddedChunks};
use crate::learner::{Learner, Statistics};
use crate::signal::Signal;

/// What to learn from and how to batch it
#[derive(Debug, Clone)]
pub struct LearningRequest {
    /// Selects the tables to learn from
    pub filter: MetaFilter,

    /// Columns to project; `None` keeps every column
    pub columns: Option<Vec<String>>,

    /// Rows to keep
    pub row_filter: Option<RowFilter>,

    /// Number of samples per batch
    pub granularity: usize,

    /// Name of the ordering strategy
    pub ordering: String,

    /// Options for the ordering strategy
    pub ordering_options: Options,

    /// Options passed to every `learn` call
    pub learn_options: Options,
}

impl LearningRequest {
    /// Learn from every table matching `filter`, one sample per batch, in
    /// seeded random order
    pub fn new(filter: MetaFilter) -> Self {
        Self {
            filter,
            columns: None,
            row_filter: None,
            granularity: 1,
            ordering: RANDOM.to_string(),
            ordering_options: Options::new(),
            learn_options: Options::new(),
        }
    }

    /// Set the projected columns
    #[must_use]
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Set the row filter
    #[must_use]
    pub fn with_row_filter(mut self, row_filter: RowFilter) -> Self {
        self.row_filter = Some(row_filter);
        self
    }

    /// Set the batch size
    #[must_use]
    pub fn with_granularity(mut self, granularity: usize) -> Self {
        self.granularity = granularity;
        self
    }

    /// Set the ordering strategy and its options
    #[must_use]
    pub fn with_ordering(mut self, name: impl Into<String>, options: Options) -> Self {
        self.ordering = name.into();
        self.ordering_options = options;
        self
    }

    /// Set the options passed to the learner
    #[must_use]
    pub fn with_learn_options(mut self, options: Options) -> Self {
        self.learn_options = options;
        self
    }
}

enum RunState {
    Pending,
    Running(PaddedChunks<vec::IntoIter<Sample>>),
    Finished,
}

/// A learning run that dispatches one batch per `next()` call
///
/// Nothing is read from the store until the first batch is requested.
/// Dropping the run early cancels it; only the batches already yielded
/// have reached the learner. An error ends the run.
pub struct LearningRun<'a> {
    store: &'a DataStore,
    orderings: &'a OrderingRegistry,
    learner: &'a mut dyn Learner,
    request: LearningRequest,
    granularity: NonZeroUsize,
    state: RunState,
    dispatched: usize,
}

impl<'a> LearningRun<'a> {
    /// Prepare a run; fails only on a zero granularity
    pub fn new(
        store: &'a DataStore,
        orderings: &'a OrderingRegistry,
        learner: &'a mut dyn Learner,
        request: LearningRequest,
    ) -> Result<Self> {
        let granularity = NonZeroUsize::new(request.granularity)
            .ok_or_else(|| Error::InvalidInput("granularity must be at least 1".to_string()))?;
        Ok(Self {
            store,
            orderings,
            learner,
            request,
            granularity,
            state: RunState::Pending,
            dispatched: 0,
        })
    }

    /// Number of batches handed to the learner so far
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    fn resolve(&self) -> Result<Vec<Sample>> {
        let samples = self.store.collect_samples(
            &self.request.filter,
            self.request.columns.as_deref(),
            self.request.row_filter.as_ref(),
        )?;
        let strategy = self.orderings.resolve(&self.request.ordering)?;
        let ordered = strategy.reorder(samples, &self.request.ordering_options)?;
        info!(
            samples = ordered.len(),
            granularity = self.granularity.get(),
            ordering = %self.request.ordering,
            "Starting learning run"
        );
        Ok(ordered)
    }

    fn step(&mut self) -> Option<Result<Statistics>> {
        if matches!(self.state, RunState::Pending) {
            let samples = match self.resolve() {
                Ok(samples) => samples,
                Err(e) => return Some(Err(e)),
            };
            self.state = RunState::Running(padded_chunks(samples, self.granularity));
        }

        let RunState::Running(groups) = &mut self.state else {
            return None;
        };
        let signal = Signal::from_group(groups.next()?)?;
        self.dispatched += 1;
        debug!(batch = self.dispatched, samples = signal.len(), "Dispatching batch");
        Some(self.learner.learn(&signal, &self.request.learn_options))
    }
}

impl Iterator for LearningRun<'_> {
    type Item = Result<Statistics>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.step();
        if matches!(item, None | Some(Err(_))) {
            self.state = RunState::Finished;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_warehouse_core::{Column, Frame, MetaValue, Table};
    use test_case::test_case;

    /// Records the shape of every signal it sees
    #[derive(Default)]
    struct Recorder {
        shapes: Vec<(bool, usize)>,
        indices: Vec<i64>,
    }

    impl Learner for Recorder {
        fn learn(&mut self, signal: &Signal, _options: &Options) -> Result<Statistics> {
            self.shapes.push((signal.is_single(), signal.len()));
            self.indices.extend(
                signal
                    .metadata()
                    .iter()
                    .filter_map(|m| m.get("index").and_then(MetaValue::as_i64)),
            );
            Ok(Statistics::new())
        }

        fn predict(&self, _signal: &Signal, _options: &Options) -> Result<Statistics> {
            Ok(Statistics::new())
        }

        fn settings(&self) -> Options {
            Options::new()
        }
    }

    fn store(n: i64) -> DataStore {
        let mut store = DataStore::new();
        for i in 0..n {
            let frame = Frame::new(vec![
                Column::int64("x", vec![Some(i), Some(-i)]),
                Column::int64("y", vec![Some(1), Some(2)]),
            ])
            .unwrap();
            let metadata = [("index", MetaValue::Int(i)), ("kind", MetaValue::from("raw"))]
                .into_iter()
                .collect();
            store.add_table(&format!("t{i}"), "", Table::with_metadata(frame, metadata));
        }
        store
    }

    #[test_case(7, 3, vec![(false, 3), (false, 3), (true, 1)] ; "padded last batch")]
    #[test_case(6, 3, vec![(false, 3), (false, 3)] ; "exact multiple")]
    #[test_case(3, 1, vec![(true, 1), (true, 1), (true, 1)] ; "granularity one")]
    #[test_case(5, 2, vec![(false, 2), (false, 2), (true, 1)] ; "single leftover")]
    #[test_case(0, 4, vec![] ; "no matches")]
    fn test_batch_shapes(n: i64, granularity: usize, expected: Vec<(bool, usize)>) {
        let store = store(n);
        let orderings = OrderingRegistry::default();
        let mut learner = Recorder::default();

        let request = LearningRequest::new(MetaFilter::all()).with_granularity(granularity);
        let results: Vec<_> = LearningRun::new(&store, &orderings, &mut learner, request)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(results.len(), expected.len());
        assert_eq!(learner.shapes, expected);
    }

    #[test]
    fn test_run_is_lazy_and_cancellable() {
        let store = store(10);
        let orderings = OrderingRegistry::default();
        let mut learner = Recorder::default();

        let request = LearningRequest::new(MetaFilter::all()).with_granularity(2);
        let mut run = LearningRun::new(&store, &orderings, &mut learner, request).unwrap();
        assert_eq!(run.dispatched(), 0);

        run.next().unwrap().unwrap();
        run.next().unwrap().unwrap();
        assert_eq!(run.dispatched(), 2);
        drop(run);

        assert_eq!(learner.shapes.len(), 2);
    }

    #[test]
    fn test_same_seed_reproduces_batches() {
        let store = store(9);
        let orderings = OrderingRegistry::default();
        let seed: Options = [("seed".to_string(), MetaValue::Int(42))].into_iter().collect();

        let mut first = Recorder::default();
        let mut second = Recorder::default();
        for learner in [&mut first, &mut second] {
            let request = LearningRequest::new(MetaFilter::all())
                .with_granularity(4)
                .with_ordering("unknown-strategy", seed.clone());
            for result in LearningRun::new(&store, &orderings, learner, request).unwrap() {
                result.unwrap();
            }
        }

        assert_eq!(first.indices, second.indices);
        let mut sorted = first.indices.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_sorted_projection_and_row_filter() {
        let store = store(4);
        let orderings = OrderingRegistry::default();
        let mut learner = Recorder::default();
        let order: Options = [("order_keys".to_string(), MetaValue::from(vec!["index"]))]
            .into_iter()
            .collect();

        let request = LearningRequest::new(MetaFilter::all().exclude("index", 2))
            .with_columns(vec!["x".to_string()])
            .with_row_filter(RowFilter::new().with("x", |cell| cell.as_f64().is_some_and(|v| v >= 0.0)))
            .with_ordering("sort", order);
        let count = LearningRun::new(&store, &orderings, &mut learner, request)
            .unwrap()
            .filter(Result::is_ok)
            .count();

        assert_eq!(count, 3);
        assert_eq!(learner.indices, vec![0, 1, 3]);
    }

    #[test]
    fn test_errors_end_the_run() {
        let store = store(3);
        let orderings = OrderingRegistry::default();
        let mut learner = Recorder::default();

        let zero = LearningRequest::new(MetaFilter::all()).with_granularity(0);
        assert!(matches!(
            LearningRun::new(&store, &orderings, &mut learner, zero),
            Err(Error::InvalidInput(_))
        ));

        let request = LearningRequest::new(MetaFilter::all()).with_columns(vec!["missing".to_string()]);
        let mut run = LearningRun::new(&store, &orderings, &mut learner, request).unwrap();
        assert!(matches!(run.next(), Some(Err(Error::ColumnNotFound(_)))));
        assert!(run.next().is_none());
    }
}
