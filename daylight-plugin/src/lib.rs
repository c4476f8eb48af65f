//! Tool plugins the model can call mid-conversation.
//!
//! A plugin describes itself (name, description, JSON parameter schema) so it can
//! be advertised to the LLM, and executes with the JSON arguments the model
//! produced. Plugins are collected in a [`PluginRegistry`].

mod registry;

pub use registry::PluginRegistry;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PluginError>;

/// Result of a plugin execution, handed back to the model as the tool output.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginOutput {
    pub content: Value,
}

impl PluginOutput {
    pub fn new(content: impl Into<Value>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Serializes a typed result into the output payload.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Self::new)
            .map_err(|e| PluginError::Other(format!("Failed to serialize output: {}", e)))
    }
}

/// A tool the model can invoke.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Name the model uses to call the tool.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameter_schema(&self) -> Value;

    async fn execute(&self, input: Value) -> Result<PluginOutput>;
}

/// Generates a parameter schema for `T`.
///
/// The `$schema` meta key is dropped since providers reject it inside
/// function declarations.
pub fn schema_for<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null);
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
    }
    schema
}
