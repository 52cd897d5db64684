//! Registry of preprocessing methods

use ml_warehouse_core::{Options, Preprocessor, Registry, Result};

use crate::scaling::{MinMaxScaler, Standardizer};

/// Preprocessing methods keyed by name
pub type PreprocessorRegistry = Registry<dyn Preprocessor>;

/// Name of the z-score preprocessor
pub const STANDARDIZE: &str = "standardize";

/// Name of the min/max rescaling preprocessor
pub const MIN_MAX: &str = "min_max";

/// Create an empty preprocessor registry
pub fn preprocessor_registry() -> PreprocessorRegistry {
    Registry::new("preprocessor")
}

/// Register the built-in preprocessors
pub fn register_builtin(registry: &mut PreprocessorRegistry) -> Result<()> {
    registry.register(STANDARDIZE, |options: &Options| {
        Ok(Box::new(Standardizer::from_settings(options)?) as Box<dyn Preprocessor>)
    })?;
    registry.register(MIN_MAX, |options: &Options| {
        Ok(Box::new(MinMaxScaler::from_settings(options)?) as Box<dyn Preprocessor>)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_warehouse_core::Error;

    #[test]
    fn test_builtin_registration() {
        let mut registry = preprocessor_registry();
        register_builtin(&mut registry).unwrap();
        assert_eq!(registry.names(), vec![MIN_MAX, STANDARDIZE]);
        assert!(registry.create(STANDARDIZE, &Options::new()).is_ok());

        assert!(matches!(
            register_builtin(&mut registry),
            Err(Error::DuplicateRegistration(_))
        ));
    }
}
