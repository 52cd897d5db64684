//! Sessions pairing a learner with a data warehouse

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use ml_warehouse_core::{Frame, MetaFilter, Options, RowFilter, Sample};
use ml_warehouse_learn::{Learner, LearnerRegistry, LearningRequest, LearningRun, Signal, Statistics};
use ml_warehouse_shuffle::OrderingRegistry;
use ml_warehouse_transforms::{PipelineSettings, PreprocessorRegistry};

use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::warehouse::{DataWarehouse, WarehouseSnapshot};

/// Identifier of a session
pub type SessionId = String;

const SNAPSHOT_VERSION: u32 = 1;

/// The registries every session draws its capabilities from
#[derive(Clone)]
pub struct Registries {
    /// Preprocessing methods
    pub preprocessors: Arc<PreprocessorRegistry>,

    /// Learners
    pub learners: Arc<LearnerRegistry>,

    /// Ordering strategies
    pub orderings: Arc<OrderingRegistry>,
}

impl Registries {
    /// Registries holding every built-in capability
    pub fn builtin() -> Result<Self> {
        let mut preprocessors = ml_warehouse_transforms::preprocessor_registry();
        ml_warehouse_transforms::register_builtin(&mut preprocessors)?;
        let mut learners = ml_warehouse_learn::learner_registry();
        ml_warehouse_learn::register_builtin(&mut learners)?;
        Ok(Self {
            preprocessors: Arc::new(preprocessors),
            learners: Arc::new(learners),
            orderings: Arc::new(OrderingRegistry::with_builtin()),
        })
    }
}

/// A preprocessing call: which method, on which tables, tagged how
#[derive(Debug, Clone)]
pub struct PreprocessRequest {
    /// Registered preprocessor name
    pub method: String,

    /// Settings used if the preprocessor has to be created
    pub settings: Options,

    /// Projection, tags and batch mode
    pub pipeline: PipelineSettings,

    /// Explicit tables to preprocess
    pub table_ids: Option<Vec<String>>,

    /// Filter selecting the tables to preprocess
    pub filter: Option<MetaFilter>,
}

impl PreprocessRequest {
    /// Create a request with no table selection yet
    pub fn new(method: impl Into<String>, pipeline: PipelineSettings) -> Self {
        Self {
            method: method.into(),
            settings: Options::new(),
            pipeline,
            table_ids: None,
            filter: None,
        }
    }

    /// Set the creation settings
    #[must_use]
    pub fn with_settings(mut self, settings: Options) -> Self {
        self.settings = settings;
        self
    }

    /// Select tables by identifier
    #[must_use]
    pub fn with_table_ids(mut self, table_ids: Vec<String>) -> Self {
        self.table_ids = Some(table_ids);
        self
    }

    /// Select tables by metadata filter
    #[must_use]
    pub fn with_filter(mut self, filter: MetaFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

struct LearnerSlot {
    name: String,
    learner: Box<dyn Learner>,
}

struct Session {
    learner: Option<LearnerSlot>,
    warehouse: String,
}

/// Owns every session, and the warehouses they point at
///
/// Several sessions may share one warehouse after
/// [`SystemManager::sync_data_warehouse`].
pub struct SystemManager {
    name: String,
    config_path: Option<PathBuf>,
    config: SystemConfig,
    registries: Registries,
    sessions: BTreeMap<SessionId, Session>,
    warehouses: BTreeMap<String, DataWarehouse>,
}

impl SystemManager {
    /// Create a system configured from the JSON file at `config_path`
    pub fn new(name: impl Into<String>, config_path: &Path, registries: Registries) -> Result<Self> {
        let config = SystemConfig::load(config_path)?;
        let mut manager = Self::with_config(name, config, registries);
        manager.config_path = Some(config_path.to_path_buf());
        Ok(manager)
    }

    /// Create a system from an in-memory configuration
    pub fn with_config(name: impl Into<String>, config: SystemConfig, registries: Registries) -> Self {
        Self {
            name: name.into(),
            config_path: None,
            config,
            registries,
            sessions: BTreeMap::new(),
            warehouses: BTreeMap::new(),
        }
    }

    /// System name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Active configuration
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Session identifiers, sorted
    pub fn sessions(&self) -> Vec<&str> {
        self.sessions.keys().map(String::as_str).collect()
    }

    /// Create a session with a fresh warehouse and, optionally, a learner
    pub fn create_session(
        &mut self,
        learner_name: Option<&str>,
        learner_options: &Options,
        data_root: impl Into<PathBuf>,
    ) -> Result<SessionId> {
        let learner = learner_name
            .map(|name| self.build_learner(name, learner_options))
            .transpose()?;
        let warehouse = self.add_warehouse(data_root.into());
        let session_id = Uuid::new_v4().to_string();
        self.sessions.insert(session_id.clone(), Session { learner, warehouse });
        info!(session = %session_id, "Created session");
        Ok(session_id)
    }

    /// Load data folders into the session's warehouse
    pub fn load_data<S: AsRef<str>>(
        &mut self,
        session: &str,
        folders: &[S],
        meta_keys: &[String],
    ) -> Result<Vec<String>> {
        self.warehouse_mut(session)?.load_data_folders(folders, meta_keys)
    }

    /// A learning request prefilled with the configured ordering and granularity
    pub fn learning_request(&self, filter: MetaFilter) -> LearningRequest {
        LearningRequest::new(filter)
            .with_granularity(self.config.granularity)
            .with_ordering(self.config.ordering.clone(), self.config.ordering_options())
    }

    /// Start a lazy learning run on the session's learner
    ///
    /// No data is selected until the first batch is pulled.
    pub fn learn_data(&mut self, session: &str, request: LearningRequest) -> Result<LearningRun<'_>> {
        let entry = self
            .sessions
            .get_mut(session)
            .ok_or_else(|| ml_warehouse_core::Error::not_found("session", session))?;
        let warehouse = self
            .warehouses
            .get(&entry.warehouse)
            .ok_or_else(|| ml_warehouse_core::Error::not_found("warehouse", &entry.warehouse))?;
        let slot = entry
            .learner
            .as_mut()
            .ok_or_else(|| ml_warehouse_core::Error::not_found("learner of session", session))?;
        debug!(session, learner = %slot.name, "Starting learning");
        Ok(LearningRun::new(
            warehouse.store(),
            &self.registries.orderings,
            slot.learner.as_mut(),
            request,
        )?)
    }

    /// Ask the session's learner for a prediction
    pub fn predict(&self, session: &str, signal: &Signal, options: &Options) -> Result<Statistics> {
        let slot = self
            .session(session)?
            .learner
            .as_ref()
            .ok_or_else(|| ml_warehouse_core::Error::not_found("learner of session", session))?;
        Ok(slot.learner.predict(signal, options)?)
    }

    /// Replace the session's learner with a new instance
    pub fn attach_learner(&mut self, session: &str, name: &str, options: &Options) -> Result<()> {
        let slot = self.build_learner(name, options)?;
        self.session_mut(session)?.learner = Some(slot);
        Ok(())
    }

    /// Give the session a fresh warehouse rooted at `data_root`
    ///
    /// Without `replace` nothing changes and `false` is returned.
    pub fn replace_data_source(
        &mut self,
        session: &str,
        data_root: impl Into<PathBuf>,
        replace: bool,
    ) -> Result<bool> {
        self.session(session)?;
        if !replace {
            warn!(session, "Data source not replaced");
            return Ok(false);
        }
        let warehouse = self.add_warehouse(data_root.into());
        self.session_mut(session)?.warehouse = warehouse;
        self.drop_unused_warehouses();
        Ok(true)
    }

    /// The session's learner, if any
    pub fn learner(&self, session: &str) -> Result<Option<&dyn Learner>> {
        Ok(self.session(session)?.learner.as_ref().map(|slot| slot.learner.as_ref()))
    }

    /// The session's warehouse
    pub fn warehouse(&self, session: &str) -> Result<&DataWarehouse> {
        let key = &self.session(session)?.warehouse;
        Ok(self
            .warehouses
            .get(key)
            .ok_or_else(|| ml_warehouse_core::Error::not_found("warehouse", key))?)
    }

    /// The session's warehouse, mutably
    pub fn warehouse_mut(&mut self, session: &str) -> Result<&mut DataWarehouse> {
        let key = self.session(session)?.warehouse.clone();
        Ok(self
            .warehouses
            .get_mut(&key)
            .ok_or_else(|| ml_warehouse_core::Error::not_found("warehouse", &key))?)
    }

    /// Preprocess tables selected by identifiers or by filter
    ///
    /// Exactly one selection must be given; otherwise nothing is processed
    /// and an empty list is returned. An empty identifier list counts as no
    /// selection.
    pub fn preprocess(&mut self, session: &str, request: &PreprocessRequest) -> Result<Vec<String>> {
        let table_ids = request.table_ids.as_ref().filter(|ids| !ids.is_empty());
        let warehouse = self.warehouse_mut(session)?;
        match (table_ids, &request.filter) {
            (Some(_), Some(_)) => {
                warn!("Specify either table ids or a metadata filter. Skipping preprocessing");
                Ok(Vec::new())
            }
            (Some(ids), None) => {
                warehouse.preprocess_by_ids(ids, &request.method, &request.settings, &request.pipeline)
            }
            (None, Some(filter)) => {
                warehouse.preprocess_by_filter(filter, &request.method, &request.settings, &request.pipeline)
            }
            (None, None) => {
                warn!("No tables selected for preprocessing");
                Ok(Vec::new())
            }
        }
    }

    /// Frames of `table_id` (if given) followed by frames matching `filter` (if given)
    pub fn get_data<S: AsRef<str>>(
        &self,
        session: &str,
        table_id: Option<&str>,
        filter: Option<&MetaFilter>,
        columns: Option<&[S]>,
        row_filter: Option<&RowFilter>,
    ) -> Result<Vec<Frame>> {
        let warehouse = self.warehouse(session)?;
        let mut frames = Vec::new();
        if let Some(table_id) = table_id {
            frames.push(warehouse.get_data_by_id(table_id, columns, row_filter)?);
        }
        if let Some(filter) = filter {
            frames.extend(warehouse.get_data_by_filter(filter, columns, row_filter)?);
        }
        Ok(frames)
    }

    /// Frames plus metadata of every table matching `filter`
    pub fn get_complete_data<S: AsRef<str>>(
        &self,
        session: &str,
        filter: &MetaFilter,
        columns: Option<&[S]>,
        row_filter: Option<&RowFilter>,
    ) -> Result<Vec<Sample>> {
        self.warehouse(session)?
            .get_complete_data_by_filter(filter, columns, row_filter)
    }

    /// Make every session use this session's warehouse
    pub fn sync_data_warehouse(&mut self, session: &str) -> Result<()> {
        let warehouse = self.session(session)?.warehouse.clone();
        for entry in self.sessions.values_mut() {
            entry.warehouse.clone_from(&warehouse);
        }
        self.drop_unused_warehouses();
        info!(session, sessions = self.sessions.len(), "Synchronized data warehouses");
        Ok(())
    }

    /// Write the whole system to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = SystemSnapshot {
            version: SNAPSHOT_VERSION,
            name: self.name.clone(),
            config_path: self.config_path.clone(),
            config: self.config.clone(),
            warehouses: self
                .warehouses
                .iter()
                .map(|(key, w)| (key.clone(), w.snapshot()))
                .collect(),
            sessions: self
                .sessions
                .iter()
                .map(|(id, s)| SessionSnapshot {
                    id: id.clone(),
                    learner: s.learner.as_ref().map(|slot| (slot.name.clone(), slot.learner.settings())),
                    warehouse: s.warehouse.clone(),
                })
                .collect(),
        };
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, &snapshot)?;
        info!(path = %path.display(), sessions = self.sessions.len(), "Saved system");
        Ok(())
    }

    /// Read a system written by [`SystemManager::save`]
    ///
    /// The configuration is read again from its file when the system was
    /// created from one.
    pub fn load(path: &Path, registries: Registries) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot: SystemSnapshot = bincode::deserialize_from(reader)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Snapshot(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }

        let config = match &snapshot.config_path {
            Some(config_path) => SystemConfig::load(config_path)?,
            None => snapshot.config,
        };
        let mut manager = Self::with_config(snapshot.name, config, registries);
        manager.config_path = snapshot.config_path;

        for (key, warehouse) in snapshot.warehouses {
            let warehouse = DataWarehouse::restore(warehouse, Arc::clone(&manager.registries.preprocessors))?;
            manager.warehouses.insert(key, warehouse);
        }
        for session in snapshot.sessions {
            if !manager.warehouses.contains_key(&session.warehouse) {
                return Err(Error::Snapshot(format!("session {} has no warehouse", session.id)));
            }
            let learner = session
                .learner
                .map(|(name, settings)| manager.build_learner(&name, &settings))
                .transpose()?;
            manager.sessions.insert(
                session.id,
                Session {
                    learner,
                    warehouse: session.warehouse,
                },
            );
        }
        info!(path = %path.display(), sessions = manager.sessions.len(), "Loaded system");
        Ok(manager)
    }

    fn build_learner(&self, name: &str, options: &Options) -> Result<LearnerSlot> {
        let learner = self.registries.learners.create(name, options)?;
        Ok(LearnerSlot {
            name: name.to_string(),
            learner,
        })
    }

    fn add_warehouse(&mut self, data_root: PathBuf) -> String {
        let key = Uuid::new_v4().to_string();
        let warehouse = DataWarehouse::new(data_root, Arc::clone(&self.registries.preprocessors));
        self.warehouses.insert(key.clone(), warehouse);
        key
    }

    fn drop_unused_warehouses(&mut self) {
        let used: BTreeSet<&String> = self.sessions.values().map(|s| &s.warehouse).collect();
        self.warehouses.retain(|key, _| used.contains(key));
    }

    fn session(&self, session: &str) -> Result<&Session> {
        Ok(self
            .sessions
            .get(session)
            .ok_or_else(|| ml_warehouse_core::Error::not_found("session", session))?)
    }

    fn session_mut(&mut self, session: &str) -> Result<&mut Session> {
        Ok(self
            .sessions
            .get_mut(session)
            .ok_or_else(|| ml_warehouse_core::Error::not_found("session", session))?)
    }
}

#[derive(Serialize, Deserialize)]
struct SessionSnapshot {
    id: SessionId,
    learner: Option<(String, Options)>,
    warehouse: String,
}

#[derive(Serialize, Deserialize)]
struct SystemSnapshot {
    version: u32,
    name: String,
    config_path: Option<PathBuf>,
    config: SystemConfig,
    warehouses: Vec<(String, WarehouseSnapshot)>,
    sessions: Vec<SessionSnapshot>,
}
