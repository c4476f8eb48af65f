//! Web search tool. Returns a fixed placeholder result until a real search
//! backend is wired in.

use crate::input;
use async_trait::async_trait;
use daylight_plugin::{schema_for, Plugin, PluginOutput, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_LIMIT: u32 = 5;

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct WebSearchInput {
    /// Search query
    #[schemars(length(min = 1))]
    pub query: String,
    /// Maximum number of results
    #[serde(default = "default_limit", deserialize_with = "input::integer")]
    #[schemars(with = "u32", range(min = 1, max = 10))]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl WebSearchInput {
    pub fn validate(&self) -> Result<()> {
        input::check_query(&self.query)?;
        input::check_range("limit", self.limit, 1, 10)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebSearchItem {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebSearchResponse {
    pub provider: String,
    pub query: String,
    pub limit: u32,
    pub items: Vec<WebSearchItem>,
}

#[derive(Debug, Default)]
pub struct WebSearchPlugin;

impl WebSearchPlugin {
    pub fn new() -> Self {
        Self
    }

    pub async fn run_web_search(&self, input: &WebSearchInput) -> WebSearchResponse {
        WebSearchResponse {
            provider: "google-search-placeholder".to_string(),
            query: input.query.clone(),
            limit: input.limit,
            items: vec![WebSearchItem {
                title: "Placeholder search result".to_string(),
                url: "https://example.com".to_string(),
                snippet: "Replace runGoogleSearch with a real Google Search integration."
                    .to_string(),
            }],
        }
    }
}

#[async_trait]
impl Plugin for WebSearchPlugin {
    fn name(&self) -> &str {
        "googleSearch"
    }

    fn description(&self) -> &str {
        "Searches the web for recent information."
    }

    fn parameter_schema(&self) -> Value {
        schema_for::<WebSearchInput>()
    }

    async fn execute(&self, input: Value) -> Result<PluginOutput> {
        let params: WebSearchInput = input::parse(input)?;
        params.validate()?;
        PluginOutput::json(&self.run_web_search(&params).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daylight_plugin::PluginError;
    use serde_json::json;

    #[tokio::test]
    async fn returns_placeholder_result() {
        let output = WebSearchPlugin::new()
            .execute(json!({"query": "daylight frames"}))
            .await
            .unwrap();
        assert_eq!(
            output.content,
            json!({
                "provider": "google-search-placeholder",
                "query": "daylight frames",
                "limit": 5,
                "items": [{
                    "title": "Placeholder search result",
                    "url": "https://example.com",
                    "snippet": "Replace runGoogleSearch with a real Google Search integration."
                }]
            })
        );
    }

    #[tokio::test]
    async fn validates_limit_and_query() {
        let plugin = WebSearchPlugin::new();
        let output = plugin
            .execute(json!({"query": "q", "limit": 10}))
            .await
            .unwrap();
        assert_eq!(output.content["limit"], 10);

        for input in [
            json!({"query": "q", "limit": 0}),
            json!({"query": "q", "limit": 11}),
            json!({"query": "q", "limit": 1.5}),
            json!({"query": ""}),
            json!({}),
        ] {
            assert!(matches!(
                plugin.execute(input).await,
                Err(PluginError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn schema_requires_query() {
        let schema = WebSearchPlugin::new().parameter_schema();
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(schema["properties"]["limit"]["maximum"].as_f64(), Some(10.0));
    }
}
