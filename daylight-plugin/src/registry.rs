use crate::{Plugin, PluginError, PluginOutput};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry for managing plugins.
///
/// The registry is responsible for:
/// - Registering plugins under a unique name
/// - Looking up plugins by name
/// - Executing plugins
/// - Providing plugin specifications to the LLM
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin.
    /// Returns false if a plugin with the same name is already registered; the
    /// existing one is kept.
    pub fn register<T: Plugin + 'static>(&mut self, plugin: T) -> bool {
        let name = plugin.name().to_string();
        if self.plugins.contains_key(&name) {
            return false;
        }
        self.plugins.insert(name, Arc::new(plugin));
        true
    }

    /// Get the number plugins that exist in the registry
    pub fn get_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Get a plugin by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.get(name)
    }

    /// Registered plugin names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Execute a plugin by name.
    pub async fn execute(&self, name: &str, input: Value) -> Result<PluginOutput, PluginError> {
        let plugin = self
            .get(name)
            .ok_or_else(|| PluginError::Other(format!("Unknown plugin: {}", name)))?;

        plugin.execute(input).await
    }

    /// Get plugin specifications for the LLM, ordered by name.
    pub fn plugin_specs(&self) -> Vec<Value> {
        self.names()
            .into_iter()
            .filter_map(|name| self.plugins.get(name))
            .map(|plugin| {
                serde_json::json!({
                    "name": plugin.name(),
                    "description": plugin.description(),
                    "parameters": plugin.parameter_schema(),
                })
            })
            .collect()
    }
}
