//! Name-keyed registry of ordering strategies with a fallback default

use std::collections::BTreeMap;
use std::fmt;

use tracing::warn;

use ml_warehouse_core::{Error, Result};

use crate::strategy::{OrderingStrategy, RandomOrder, SortByMetadata};

/// Name of the seeded shuffle strategy
pub const RANDOM: &str = "random";

/// Name of the metadata sort strategy
pub const SORT: &str = "sort";

/// Ordering strategies keyed by name
///
/// Unknown names resolve to the default strategy, which is the seeded
/// shuffle unless changed.
pub struct OrderingRegistry {
    strategies: BTreeMap<String, Box<dyn OrderingStrategy>>,
    default: String,
}

impl OrderingRegistry {
    /// Create a registry holding only the seeded shuffle as default
    pub fn new() -> Self {
        let mut strategies: BTreeMap<String, Box<dyn OrderingStrategy>> = BTreeMap::new();
        strategies.insert(RANDOM.to_string(), Box::new(RandomOrder));
        Self {
            strategies,
            default: RANDOM.to_string(),
        }
    }

    /// Create a registry with every built-in strategy
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .strategies
            .insert(SORT.to_string(), Box::new(SortByMetadata));
        registry
    }

    /// Register a strategy; registering a name twice is an error
    pub fn register(&mut self, name: &str, strategy: Box<dyn OrderingStrategy>) -> Result<()> {
        if self.strategies.contains_key(name) {
            return Err(Error::DuplicateRegistration(format!(
                "ordering strategy with name '{name}' already exists"
            )));
        }
        self.strategies.insert(name.to_string(), strategy);
        Ok(())
    }

    /// Change the strategy used for unknown names
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.strategies.contains_key(name) {
            return Err(Error::not_found("ordering strategy", name));
        }
        self.default = name.to_string();
        Ok(())
    }

    /// Look up a strategy by exact name
    pub fn get(&self, name: &str) -> Result<&dyn OrderingStrategy> {
        self.strategies
            .get(name)
            .map(|strategy| &**strategy)
            .ok_or_else(|| Error::not_found("ordering strategy", name))
    }

    /// Look up a strategy, falling back to the default for unknown names
    pub fn resolve(&self, name: &str) -> Result<&dyn OrderingStrategy> {
        if self.strategies.contains_key(name) {
            return self.get(name);
        }
        warn!(name, default = %self.default, "Unknown ordering strategy, using default");
        self.get(&self.default)
    }

    /// Name of the default strategy
    pub fn default_name(&self) -> &str {
        &self.default
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }
}

impl Default for OrderingRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for OrderingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderingRegistry")
            .field("names", &self.names())
            .field("default", &self.default)
            .finish()
    }
}
