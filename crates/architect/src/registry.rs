//! Builder registry.
//!
//! The [`BuilderRegistry`] maps builder ids (`package:name`) to the
//! [`BuilderFactory`] that instantiates them. Builder packages still describe
//! their builders on disk; the registry supplies the implementation.

use crate::builder::BuilderFactory;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of builder factories, keyed by builder id.
///
/// # Example
///
/// ```ignore
/// let mut registry = BuilderRegistry::new();
/// registry.register("@devkit/builders:noop", |context: BuilderContext| {
///     Box::new(NoopBuilder::new(context)) as Box<dyn Builder>
/// });
/// ```
#[derive(Default)]
pub struct BuilderRegistry {
    factories: HashMap<String, Arc<dyn BuilderFactory>>,
}

impl BuilderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `builder`, replacing any previous one.
    pub fn register<F>(&mut self, builder: impl Into<String>, factory: F)
    where
        F: BuilderFactory + 'static,
    {
        self.factories.insert(builder.into(), Arc::new(factory));
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<F>(mut self, builder: impl Into<String>, factory: F) -> Self
    where
        F: BuilderFactory + 'static,
    {
        self.register(builder, factory);
        self
    }

    /// Look up the factory for a builder id.
    #[must_use]
    pub fn get(&self, builder: &str) -> Option<&Arc<dyn BuilderFactory>> {
        self.factories.get(builder)
    }

    /// Whether a factory is registered for `builder`.
    #[must_use]
    pub fn contains(&self, builder: &str) -> bool {
        self.factories.contains_key(builder)
    }

    /// Registered builder ids, sorted.
    #[must_use]
    pub fn builder_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderRegistry")
            .field("builders", &self.builder_ids())
            .finish()
    }
}
