//! Lineage-preserving preprocessing of stored tables

use tracing::{debug, info};
use uuid::Uuid;

use ml_warehouse_core::{apply_filter, DataStore, Error, Frame, Preprocessor, Result, Tag};

/// How a preprocessing run projects its input and tags its output
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Columns handed to the preprocessor; empty means every column
    pub source_columns: Vec<String>,

    /// Tag added to every derived table
    pub mark_new: Tag,

    /// Tag added to every original table, if any
    pub mark_old: Option<Tag>,

    /// Transform all inputs with one ordered batch call
    pub batch_mode: bool,
}

impl PipelineSettings {
    /// Create settings that only add `mark_new`
    pub fn new(source_columns: Vec<String>, mark_new: Tag) -> Self {
        Self {
            source_columns,
            mark_new,
            mark_old: None,
            batch_mode: false,
        }
    }

    /// Also tag the original tables
    #[must_use]
    pub fn with_mark_old(mut self, mark_old: Tag) -> Self {
        self.mark_old = Some(mark_old);
        self
    }

    /// Switch batch mode on or off
    #[must_use]
    pub fn with_batch_mode(mut self, batch_mode: bool) -> Self {
        self.batch_mode = batch_mode;
        self
    }
}

/// Run `preprocessor` over the given tables and register the derived tables
///
/// Returns the identifiers of the derived tables, index-aligned with
/// `table_ids`. Every input is projected and transformed before the store
/// is touched, so a failing preprocessor leaves the store unchanged.
pub fn apply_preprocessing(
    store: &mut DataStore,
    table_ids: &[String],
    preprocessor: &mut dyn Preprocessor,
    settings: &PipelineSettings,
) -> Result<Vec<String>> {
    let projected = table_ids
        .iter()
        .map(|id| {
            let table = store.get_by_id(id)?;
            apply_filter(table.frame(), Some(settings.source_columns.as_slice()), None)
        })
        .collect::<Result<Vec<Frame>>>()?;

    let transformed = if settings.batch_mode {
        let output = preprocessor.preprocess_batch_ordered(projected)?;
        if output.len() != table_ids.len() {
            return Err(Error::ContractViolation(format!(
                "ordered batch transform returned {} frames for {} inputs",
                output.len(),
                table_ids.len()
            )));
        }
        output
    } else {
        projected
            .into_iter()
            .map(|frame| preprocessor.preprocess(frame))
            .collect::<Result<Vec<_>>>()?
    };

    let mut new_ids = Vec::with_capacity(table_ids.len());
    for (table_id, frame) in table_ids.iter().zip(transformed) {
        if let Some(mark_old) = &settings.mark_old {
            store.add_metadata(table_id, &mark_old.key, mark_old.value.clone())?;
        }
        let derived = store.get_by_id(table_id)?.derive(frame, &settings.mark_new);

        let new_id = Uuid::new_v4().to_string();
        store.add_table(&new_id, "", derived);
        debug!(parent = %table_id, table_id = %new_id, "Registered derived table");
        new_ids.push(new_id);
    }

    info!(
        count = new_ids.len(),
        batch_mode = settings.batch_mode,
        mark_new = %settings.mark_new.key,
        "Preprocessed tables"
    );
    Ok(new_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_warehouse_core::{Column, MetaValue, Options, Table};
    use proptest::prelude::*;

    /// Negates every Int64 cell
    struct Negate;

    impl Preprocessor for Negate {
        fn preprocess(&mut self, frame: Frame) -> Result<Frame> {
            let columns = frame
                .into_columns()
                .into_iter()
                .map(|column| {
                    let values = column.to_f64()?.into_iter().map(|v| v.map(|x| -x)).collect();
                    Ok(Column::float64(column.name(), values))
                })
                .collect::<Result<Vec<_>>>()?;
            Frame::new(columns)
        }

        fn update_settings(&mut self, _options: &Options) -> Result<()> {
            Ok(())
        }

        fn settings(&self) -> Options {
            Options::new()
        }
    }

    /// Violates the ordered batch contract by dropping the last frame
    struct DropLast;

    impl Preprocessor for DropLast {
        fn preprocess(&mut self, frame: Frame) -> Result<Frame> {
            Ok(frame)
        }

        fn preprocess_batch_ordered(&mut self, mut frames: Vec<Frame>) -> Result<Vec<Frame>> {
            frames.pop();
            Ok(frames)
        }

        fn update_settings(&mut self, _options: &Options) -> Result<()> {
            Ok(())
        }

        fn settings(&self) -> Options {
            Options::new()
        }
    }

    fn populated_store(n: usize) -> (DataStore, Vec<String>) {
        let mut store = DataStore::new();
        let mut ids = Vec::new();
        for i in 0..n {
            let value = i64::try_from(i).unwrap();
            let frame = Frame::new(vec![
                Column::int64("x", vec![Some(value), Some(value + 1)]),
                Column::string("name", vec![Some("a"), Some("b")]),
            ])
            .unwrap();
            let id = format!("t{i}");
            let metadata = [("index", MetaValue::Int(value))].into_iter().collect();
            store.add_table(&id, "src.csv", Table::with_metadata(frame, metadata));
            ids.push(id);
        }
        (store, ids)
    }

    #[test]
    fn test_derived_tables_carry_lineage() {
        let (mut store, ids) = populated_store(2);
        let settings = PipelineSettings::new(vec!["x".to_string()], Tag::new("negated", true))
            .with_mark_old(Tag::new("superseded", true));

        let new_ids = apply_preprocessing(&mut store, &ids, &mut Negate, &settings).unwrap();
        assert_eq!(new_ids.len(), 2);
        assert_eq!(store.len(), 4);

        for (old_id, new_id) in ids.iter().zip(&new_ids) {
            let original = store.get_by_id(old_id).unwrap();
            let derived = store.get_by_id(new_id).unwrap();

            assert_eq!(original.metadata().get("superseded"), Some(&MetaValue::Bool(true)));
            assert_eq!(original.frame().column_count(), 2);
            assert_eq!(derived.frame().column_names(), vec!["x"]);
            assert_eq!(derived.metadata().get("negated"), Some(&MetaValue::Bool(true)));
            assert_eq!(derived.metadata().get("index"), original.metadata().get("index"));
            assert_eq!(store.source(new_id), Some(""));
        }
    }

    #[test]
    fn test_unknown_column_leaves_store_untouched() {
        let (mut store, ids) = populated_store(2);
        let before = store.clone();
        let settings = PipelineSettings::new(vec!["missing".to_string()], Tag::new("n", 1))
            .with_mark_old(Tag::new("old", 1));

        let result = apply_preprocessing(&mut store, &ids, &mut Negate, &settings);
        assert!(matches!(result, Err(Error::ColumnNotFound(_))));
        assert_eq!(store, before);
    }

    #[test]
    fn test_batch_length_mismatch_is_rejected() {
        let (mut store, ids) = populated_store(3);
        let before = store.clone();
        let settings = PipelineSettings::new(Vec::new(), Tag::new("n", 1)).with_batch_mode(true);

        let result = apply_preprocessing(&mut store, &ids, &mut DropLast, &settings);
        assert!(matches!(result, Err(Error::ContractViolation(_))));
        assert_eq!(store, before);
    }

    proptest! {
        #[test]
        fn prop_batch_output_is_index_aligned(n in 0usize..12, batch_mode in any::<bool>()) {
            let (mut store, ids) = populated_store(n);
            let settings = PipelineSettings::new(vec!["x".to_string()], Tag::new("negated", true))
                .with_batch_mode(batch_mode);

            let new_ids = apply_preprocessing(&mut store, &ids, &mut Negate, &settings).unwrap();
            prop_assert_eq!(new_ids.len(), n);

            for (old_id, new_id) in ids.iter().zip(&new_ids) {
                let original = store.get_by_id(old_id).unwrap();
                let derived = store.get_by_id(new_id).unwrap();
                let expected = Negate.preprocess(original.frame().select_columns(&["x"]).unwrap()).unwrap();

                prop_assert_eq!(derived.frame(), &expected);
                prop_assert_eq!(derived.metadata().len(), original.metadata().len() + 1);
                prop_assert_eq!(&derived.metadata().keys()[..original.metadata().len()], original.metadata().keys());
            }
        }
    }
}
