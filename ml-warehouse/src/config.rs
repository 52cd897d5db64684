//! System configuration loaded from JSON

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use ml_warehouse_core::{MetaValue, Options};
use ml_warehouse_shuffle::{DEFAULT_SEED, RANDOM};

use crate::error::{Error, Result};

/// Defaults applied to every learning run of a system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Ordering strategy name
    pub ordering: String,

    /// Seed handed to the ordering strategy
    pub ordering_seed: u64,

    /// Samples per training batch
    pub granularity: usize,

    /// Log filter directive, e.g. `info` or `ml_warehouse=debug`
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            ordering: RANDOM.to_string(),
            ordering_seed: DEFAULT_SEED,
            granularity: 1,
            log_level: "info".to_string(),
        }
    }
}

impl SystemConfig {
    /// Read a configuration file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.granularity == 0 {
            return Err(Error::Config("granularity must be at least 1".to_string()));
        }
        if self.ordering.is_empty() {
            return Err(Error::Config("ordering must not be empty".to_string()));
        }
        Ok(())
    }

    /// Options handed to the ordering strategy
    pub fn ordering_options(&self) -> Options {
        let seed = i64::try_from(self.ordering_seed).unwrap_or(i64::MAX);
        [("seed".to_string(), MetaValue::Int(seed))].into_iter().collect()
    }
}
