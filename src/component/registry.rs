//! Component type registry for graph deserialization
//!
//! Serialized graphs only carry `type` + `params`; the registry maps a type
//! name back to a factory that builds the descriptor.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use super::builtin::{Constant, ListJoiner, PassThrough};
use super::ComponentDescriptor;
use crate::error::{Result, WaveError};

pub type ComponentFactory = Arc<dyn Fn(&Value) -> Result<ComponentDescriptor> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ComponentRegistry {
    factories: FxHashMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `Constant`, `PassThrough` and `ListJoiner`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Constant::TYPE, Constant::from_params);
        registry.register(PassThrough::TYPE, PassThrough::from_params);
        registry.register(ListJoiner::TYPE, ListJoiner::from_params);
        registry
    }

    /// Register (or replace) the factory for `type_name`
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<ComponentDescriptor> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn create(&self, type_name: &str, params: &Value) -> Result<ComponentDescriptor> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| WaveError::UnknownComponentType {
                type_name: type_name.to_string(),
            })?;
        let descriptor = factory(params)?;
        if descriptor.type_name() != type_name {
            tracing::warn!(
                registered = type_name,
                built = descriptor.type_name(),
                "factory built a component with a different type name"
            );
        }
        Ok(descriptor)
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}
