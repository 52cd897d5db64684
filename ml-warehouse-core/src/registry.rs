//! Name-keyed registries of capability factories

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::value::Options;

/// Builds a fresh capability instance from its settings
pub type Factory<T> = Box<dyn Fn(&Options) -> Result<Box<T>> + Send + Sync>;

/// Explicit mapping from a method name to the factory that builds it
///
/// Populated by registration calls at startup; registering a name twice is
/// an error.
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    factories: BTreeMap<String, Factory<T>>,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry; `kind` names the capability in errors
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            factories: BTreeMap::new(),
        }
    }

    /// Register a factory under `name`
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<()>
    where
        F: Fn(&Options) -> Result<Box<T>> + Send + Sync + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(Error::DuplicateRegistration(format!(
                "{} with name '{}' already exists",
                self.kind, name
            )));
        }
        self.factories.insert(name.to_string(), Box::new(factory));
        Ok(())
    }

    /// Build a new instance of the capability registered under `name`
    pub fn create(&self, name: &str, options: &Options) -> Result<Box<T>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::not_found(self.kind, name))?;
        factory(options)
    }

    /// Check whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{MetaValue, OptionsExt};

    trait Greeter {
        fn greet(&self) -> String;
    }

    struct Hello(String);

    impl Greeter for Hello {
        fn greet(&self) -> String {
            format!("hello {}", self.0)
        }
    }

    #[test]
    fn test_register_and_create() {
        let mut registry: Registry<dyn Greeter> = Registry::new("greeter");
        registry
            .register("hello", |options| {
                let name = options.get_str("name")?.unwrap_or("world").to_string();
                Ok(Box::new(Hello(name)) as Box<dyn Greeter>)
            })
            .unwrap();

        let options: Options = [("name".to_string(), MetaValue::from("table"))].into_iter().collect();
        assert_eq!(registry.create("hello", &options).unwrap().greet(), "hello table");
        assert!(matches!(registry.create("bye", &options), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry: Registry<dyn Greeter> = Registry::new("greeter");
        let factory = |_: &Options| Ok(Box::new(Hello(String::new())) as Box<dyn Greeter>);
        registry.register("hello", factory).unwrap();
        assert!(matches!(
            registry.register("hello", factory),
            Err(Error::DuplicateRegistration(_))
        ));
        assert_eq!(registry.names(), vec!["hello"]);
    }
}
