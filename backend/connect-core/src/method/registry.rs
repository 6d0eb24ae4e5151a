use crate::error::ConnectError;
use crate::method::{Method, MethodDescriptor, MethodEnv};

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// Builds a method from its default descriptor and the raw call parameters.
/// This is the method's init step.
pub type MethodFactory = Arc<
    dyn Fn(MethodDescriptor, &Value, &MethodEnv) -> Result<Box<dyn Method>, ConnectError>
        + Send
        + Sync,
>;

/// Verb name to factory.
#[derive(Clone, Default)]
pub struct MethodRegistry {
    factories: HashMap<String, MethodFactory>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in verb.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::methods::register_defaults(&mut registry);
        registry
    }

    /// Register `name`. A later registration for the same name wins.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(MethodDescriptor, &Value, &MethodEnv) -> Result<Box<dyn Method>, ConnectError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    pub fn get(&self, name: &str) -> Option<&MethodFactory> {
        self.factories.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
