//! Sentiment and priority triage of support conversations.
//!
//! A second model call classifies the whole conversation into a fixed schema so
//! agents can sort follow-ups.

mod prompts;

pub use prompts::{build_sentiment_analysis_prompt, SENTIMENT_PRIORITY_SYSTEM_PROMPT};

use crate::provider::{ObjectRequest, Provider, ProviderError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("No object generated: response did not match schema: {0}")]
    Schema(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
#[schemars(inline)]
pub enum Sentiment {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[schemars(inline)]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SentimentAnalysis {
    pub sentiment: Sentiment,
    pub priority: Priority,
    pub summary: String,
    #[serde(default)]
    pub signals: Vec<String>,
}

/// Picks the history out of a request body.
///
/// Accepts either `{"conversationHistory": ...}` or the history itself.
pub fn conversation_history(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.contains_key("conversationHistory") => map
            .remove("conversationHistory")
            .unwrap_or(Value::Null),
        other => other,
    }
}

pub struct SentimentAnalyzer {
    provider: Arc<dyn Provider>,
    model: String,
}

impl SentimentAnalyzer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub async fn analyze(&self, conversation_history: &Value) -> Result<SentimentAnalysis, SentimentError> {
        let request = ObjectRequest {
            model: self.model.clone(),
            system: Some(SENTIMENT_PRIORITY_SYSTEM_PROMPT.to_string()),
            prompt: build_sentiment_analysis_prompt(conversation_history),
            schema: daylight_plugin::schema_for::<SentimentAnalysis>(),
        };

        let object = self.provider.generate_object(request).await?;
        debug!("Sentiment object: {}", object);
        if !object.is_object() {
            return Err(SentimentError::Schema(serde::de::Error::custom(format!(
                "expected an object, got {}",
                object
            ))));
        }
        Ok(serde_json::from_value(object)?)
    }
}
