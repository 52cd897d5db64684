//! A data root, its table store and the preprocessors applied to it

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use ml_warehouse_core::{
    apply_filter, DataStore, Frame, MetaFilter, MetaValue, Options, Preprocessor, RowFilter, Sample,
};
use ml_warehouse_readers::{discover_sources, CsvReader, CsvReaderOptions, FileFormat};
use ml_warehouse_transforms::{apply_preprocessing, PipelineSettings, PreprocessorRegistry};

use crate::error::{Error, Result};

/// Extension of the files ingested from data folders
pub const DATA_EXTENSION: &str = "csv";

/// Owns one store of tables plus the preprocessor instances used on it
///
/// Preprocessors are created through the registry on first use and then
/// cached by method name, keeping whatever state they accumulate.
pub struct DataWarehouse {
    store: DataStore,
    data_root: PathBuf,
    loader: CsvReader,
    preprocessors: BTreeMap<String, Box<dyn Preprocessor>>,
    registry: Arc<PreprocessorRegistry>,
}

impl DataWarehouse {
    /// Create an empty warehouse reading from `data_root`
    pub fn new(data_root: impl Into<PathBuf>, registry: Arc<PreprocessorRegistry>) -> Self {
        Self {
            store: DataStore::new(),
            data_root: data_root.into(),
            loader: CsvReader::default(),
            preprocessors: BTreeMap::new(),
            registry,
        }
    }

    /// Use custom CSV options for later loads
    #[must_use]
    pub fn with_loader_options(mut self, options: CsvReaderOptions) -> Self {
        self.loader = CsvReader::new(options);
        self
    }

    /// Directory that data folders are resolved against
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// The underlying table store
    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// Ingest a single `.csv` file and return its new table identifier
    pub fn load_data_file(&mut self, path: &Path, meta_keys: &[String]) -> Result<String> {
        if !FileFormat::has_extension(path, DATA_EXTENSION) {
            return Err(ml_warehouse_core::Error::InvalidInput(format!(
                "{} has to be a .{DATA_EXTENSION} file",
                path.display()
            ))
            .into());
        }
        let table_id = Uuid::new_v4().to_string();
        let source = path.to_string_lossy();
        self.store.add_source(&table_id, &source, meta_keys, &self.loader)?;
        Ok(table_id)
    }

    /// Ingest every `.csv` file in each folder below the data root
    ///
    /// Files are loaded in file-name order; other files are skipped. Tables
    /// loaded before a failure stay in the store and are reported through
    /// [`Error::PartialLoad`].
    pub fn load_data_folders<S: AsRef<str>>(&mut self, folders: &[S], meta_keys: &[String]) -> Result<Vec<String>> {
        let mut table_ids = Vec::new();
        for folder in folders {
            let folder = self.data_root.join(folder.as_ref());
            if let Err(e) = self.load_folder(&folder, meta_keys, &mut table_ids) {
                if table_ids.is_empty() {
                    return Err(e);
                }
                warn!(folder = %folder.display(), loaded = table_ids.len(), "Loading stopped partway: {e}");
                return Err(Error::PartialLoad {
                    loaded: table_ids,
                    source: Box::new(e),
                });
            }
            debug!(folder = %folder.display(), "Loaded data folder");
        }
        info!(count = table_ids.len(), "Loaded data files");
        Ok(table_ids)
    }

    fn load_folder(&mut self, folder: &Path, meta_keys: &[String], table_ids: &mut Vec<String>) -> Result<()> {
        for path in discover_sources(folder, DATA_EXTENSION)? {
            table_ids.push(self.load_data_file(&path, meta_keys)?);
        }
        Ok(())
    }

    /// Preprocess every table matching `filter`
    pub fn preprocess_by_filter(
        &mut self,
        filter: &MetaFilter,
        method: &str,
        settings: &Options,
        pipeline: &PipelineSettings,
    ) -> Result<Vec<String>> {
        let table_ids = self.store.ids_by_filter(filter);
        self.preprocess_by_ids(&table_ids, method, settings, pipeline)
    }

    /// Preprocess the given tables, in order
    ///
    /// `settings` only apply when the method's preprocessor is created; a
    /// cached instance keeps its own settings.
    pub fn preprocess_by_ids(
        &mut self,
        table_ids: &[String],
        method: &str,
        settings: &Options,
        pipeline: &PipelineSettings,
    ) -> Result<Vec<String>> {
        if !self.preprocessors.contains_key(method) {
            let preprocessor = self.registry.create(method, settings)?;
            self.preprocessors.insert(method.to_string(), preprocessor);
        }
        let Some(preprocessor) = self.preprocessors.get_mut(method) else {
            return Err(ml_warehouse_core::Error::not_found("preprocessor", method).into());
        };
        Ok(apply_preprocessing(&mut self.store, table_ids, preprocessor.as_mut(), pipeline)?)
    }

    /// Get one table's data, optionally projected and row-filtered
    pub fn get_data_by_id<S: AsRef<str>>(
        &self,
        table_id: &str,
        columns: Option<&[S]>,
        row_filter: Option<&RowFilter>,
    ) -> Result<Frame> {
        let table = self.store.get_by_id(table_id)?;
        Ok(apply_filter(table.frame(), columns, row_filter)?)
    }

    /// Get the data of every table matching `filter`
    pub fn get_data_by_filter<S: AsRef<str>>(
        &self,
        filter: &MetaFilter,
        columns: Option<&[S]>,
        row_filter: Option<&RowFilter>,
    ) -> Result<Vec<Frame>> {
        Ok(self
            .get_complete_data_by_filter(filter, columns, row_filter)?
            .into_iter()
            .map(|sample| sample.frame)
            .collect())
    }

    /// Get data plus metadata of every table matching `filter`
    pub fn get_complete_data_by_filter<S: AsRef<str>>(
        &self,
        filter: &MetaFilter,
        columns: Option<&[S]>,
        row_filter: Option<&RowFilter>,
    ) -> Result<Vec<Sample>> {
        Ok(self.store.collect_samples(filter, columns, row_filter)?)
    }

    /// Add metadata to a table; keys it already carries are skipped
    pub fn add_metadata<I, K>(&mut self, table_id: &str, metadata: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, MetaValue)>,
        K: AsRef<str>,
    {
        self.store.get_by_id(table_id)?;
        for (key, value) in metadata {
            self.store.add_metadata(table_id, key.as_ref(), value)?;
        }
        Ok(())
    }

    /// Drop the cached preprocessor for `method`; the next use recreates it
    pub fn reset_preprocessor(&mut self, method: &str) -> bool {
        self.preprocessors.remove(method).is_some()
    }

    /// Update the settings of a cached preprocessor
    ///
    /// Does nothing when no instance of `method` is cached.
    pub fn update_preprocessor_settings(&mut self, method: &str, settings: &Options) -> Result<()> {
        match self.preprocessors.get_mut(method) {
            Some(preprocessor) => Ok(preprocessor.update_settings(settings)?),
            None => {
                debug!(method, "No cached preprocessor to update");
                Ok(())
            }
        }
    }

    /// Current settings of a cached preprocessor
    pub fn preprocessor_settings(&self, method: &str) -> Option<Options> {
        self.preprocessors.get(method).map(|p| p.settings())
    }

    /// Capture the store and the cached preprocessors
    pub fn snapshot(&self) -> WarehouseSnapshot {
        WarehouseSnapshot {
            data_root: self.data_root.clone(),
            store: self.store.clone(),
            preprocessors: self
                .preprocessors
                .iter()
                .map(|(method, p)| (method.clone(), p.settings()))
                .collect(),
        }
    }

    /// Rebuild a warehouse from a snapshot
    ///
    /// Cached preprocessors are recreated through `registry` from their
    /// recorded settings.
    pub fn restore(snapshot: WarehouseSnapshot, registry: Arc<PreprocessorRegistry>) -> Result<Self> {
        let preprocessors = snapshot
            .preprocessors
            .into_iter()
            .map(|(method, settings)| {
                let preprocessor = registry.create(&method, &settings)?;
                Ok((method, preprocessor))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            store: snapshot.store,
            data_root: snapshot.data_root,
            loader: CsvReader::default(),
            preprocessors,
            registry,
        })
    }

    /// Write a snapshot of this warehouse to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, &self.snapshot())?;
        info!(path = %path.display(), tables = self.store.len(), "Saved warehouse");
        Ok(())
    }

    /// Read a warehouse written by [`DataWarehouse::save`]
    pub fn load(path: &Path, registry: Arc<PreprocessorRegistry>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot: WarehouseSnapshot = bincode::deserialize_from(reader)?;
        let warehouse = Self::restore(snapshot, registry)?;
        if warehouse.store.is_empty() {
            warn!(path = %path.display(), "Loaded warehouse holds no tables");
        }
        Ok(warehouse)
    }
}

impl fmt::Debug for DataWarehouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataWarehouse")
            .field("data_root", &self.data_root)
            .field("tables", &self.store.len())
            .field("preprocessors", &self.preprocessors.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Serializable state of a [`DataWarehouse`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseSnapshot {
    /// Data root of the warehouse
    pub data_root: PathBuf,

    /// All tables with their identifiers and sources
    pub store: DataStore,

    /// Cached preprocessors as (method name, settings)
    pub preprocessors: Vec<(String, Options)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_warehouse_core::{Column, Table, Tag};
    use ml_warehouse_transforms::{preprocessor_registry, register_builtin, MIN_MAX};

    fn registry() -> Arc<PreprocessorRegistry> {
        let mut registry = preprocessor_registry();
        register_builtin(&mut registry).unwrap();
        Arc::new(registry)
    }

    fn warehouse() -> DataWarehouse {
        let mut warehouse = DataWarehouse::new("data", registry());
        for (id, v) in [("a", 0), ("b", 10)] {
            let frame = Frame::new(vec![Column::int64("x", vec![Some(v), Some(v + 5)])]).unwrap();
            let table = Table::with_metadata(frame, [("name", id)].into_iter().collect());
            warehouse.store.add_table(id, "", table);
        }
        warehouse
    }

    #[test]
    fn test_rejects_non_csv_file() {
        let mut warehouse = warehouse();
        let err = warehouse
            .load_data_file(Path::new("data/table.parquet"), &[])
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Core(ml_warehouse_core::Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_failed_folder_reports_loaded_tables() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("run");
        std::fs::create_dir(&folder).unwrap();
        for name in ["a.csv", "b.csv"] {
            std::fs::write(folder.join(name), "x\n1\n2\n").unwrap();
        }
        std::fs::write(folder.join("b.meta.json"), "[1, 2]").unwrap();

        let mut warehouse = DataWarehouse::new(root.path(), registry());
        let err = warehouse.load_data_folders(&["run"], &[]).unwrap_err();
        assert!(matches!(err, Error::PartialLoad { .. }));
        assert_eq!(err.loaded_ids().len(), 1);
        assert!(warehouse.store().get_by_id(&err.loaded_ids()[0]).is_ok());
        assert_eq!(warehouse.store().len(), 1);

        std::fs::remove_file(folder.join("a.csv")).unwrap();
        let mut fresh = DataWarehouse::new(root.path(), registry());
        let err = fresh.load_data_folders(&["run"], &[]).unwrap_err();
        assert!(matches!(err, Error::Core(_)));
        assert!(err.loaded_ids().is_empty());
    }

    #[test]
    fn test_preprocessor_is_cached_by_name() {
        let mut warehouse = warehouse();
        let pipeline = PipelineSettings::new(vec!["x".to_string()], Tag::new("scaled", true));
        let high: Options = [("high".to_string(), MetaValue::Float(2.0))].into_iter().collect();

        warehouse
            .preprocess_by_filter(&MetaFilter::all(), MIN_MAX, &high, &pipeline)
            .unwrap();
        // Cached: new settings are ignored
        let ids = warehouse
            .preprocess_by_ids(&["a".to_string()], MIN_MAX, &Options::new(), &pipeline)
            .unwrap();
        let frame = warehouse.get_data_by_id::<&str>(&ids[0], None, None).unwrap();
        assert_eq!(frame.column("x").unwrap().to_f64().unwrap(), vec![Some(0.0), Some(2.0)]);

        assert!(warehouse.reset_preprocessor(MIN_MAX));
        assert!(!warehouse.reset_preprocessor(MIN_MAX));
        assert!(warehouse.update_preprocessor_settings(MIN_MAX, &high).is_ok());
        assert_eq!(warehouse.preprocessor_settings(MIN_MAX), None);
    }

    #[test]
    fn test_unknown_method_is_not_found() {
        let mut warehouse = warehouse();
        let pipeline = PipelineSettings::new(Vec::new(), Tag::new("n", 1));
        let err = warehouse
            .preprocess_by_filter(&MetaFilter::all(), "pca", &Options::new(), &pipeline)
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(warehouse.store().len(), 2);
    }

    #[test]
    fn test_add_metadata_to_unknown_table() {
        let mut warehouse = warehouse();
        let err = warehouse
            .add_metadata("zzz", [("k", MetaValue::Int(1))])
            .unwrap_err();
        assert!(err.is_not_found());

        warehouse
            .add_metadata("a", [("name", MetaValue::from("other")), ("k", MetaValue::Int(1))])
            .unwrap();
        let metadata = warehouse.store().get_by_id("a").unwrap().metadata();
        assert_eq!(metadata.get("name"), Some(&MetaValue::from("a")));
        assert_eq!(metadata.get("k"), Some(&MetaValue::Int(1)));
    }

    #[test]
    fn test_snapshot_restores_preprocessors() {
        let mut warehouse = warehouse();
        let pipeline = PipelineSettings::new(vec!["x".to_string()], Tag::new("scaled", true));
        let high: Options = [("high".to_string(), MetaValue::Float(4.0))].into_iter().collect();
        warehouse
            .preprocess_by_ids(&["b".to_string()], MIN_MAX, &high, &pipeline)
            .unwrap();

        let snapshot = warehouse.snapshot();
        let restored = DataWarehouse::restore(snapshot.clone(), registry()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.store().len(), 3);
        assert_eq!(
            restored.preprocessor_settings(MIN_MAX).unwrap().get("high"),
            Some(&MetaValue::Float(4.0))
        );
    }
}
