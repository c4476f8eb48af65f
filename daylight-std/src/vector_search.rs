//! Knowledge-base retrieval backed by an external vector search service.
//!
//! The service is queried over HTTP. When it is unreachable, slow, or answers
//! with something unexpected, the tool falls back to a fixed pair of
//! placeholder matches so the chat keeps working.

use crate::input;
use async_trait::async_trait;
use daylight_core::VectorSearchConfig;
use daylight_plugin::{schema_for, Plugin, PluginOutput, Result};
use reqwest::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_TOP_K: u32 = 5;
const DEFAULT_SCORE_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VectorSearchInput {
    /// Natural-language search query
    #[schemars(length(min = 1))]
    pub query: String,
    /// Maximum number of documents to retrieve
    #[serde(default = "default_top_k", deserialize_with = "input::integer")]
    #[schemars(with = "u32", range(min = 1, max = 20))]
    pub top_k: u32,
    /// Minimum similarity score a document needs to be returned
    #[serde(default = "default_score_threshold")]
    #[schemars(range(min = 0.0, max = 1.0))]
    pub score_threshold: f64,
}

fn default_top_k() -> u32 {
    DEFAULT_TOP_K
}

fn default_score_threshold() -> f64 {
    DEFAULT_SCORE_THRESHOLD
}

impl VectorSearchInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: DEFAULT_TOP_K,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_score_threshold(mut self, score_threshold: f64) -> Self {
        self.score_threshold = score_threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        input::check_query(&self.query)?;
        input::check_range("topK", self.top_k, 1, 20)?;
        input::check_range("scoreThreshold", self.score_threshold, 0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorSearchMatch {
    pub id: String,
    pub score: f64,
    pub text: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VectorSearchProvider {
    #[serde(rename = "vector-search-api")]
    Api,
    #[serde(rename = "vector-search-placeholder")]
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorSearchResponse {
    pub provider: VectorSearchProvider,
    pub query: String,
    pub top_k: u32,
    pub score_threshold: f64,
    pub matches: Vec<VectorSearchMatch>,
    pub text_chunks: Vec<String>,
}

#[derive(Error, Debug)]
pub enum VectorSearchError {
    #[error("VECTOR_SEARCH_URL is not configured.")]
    NotConfigured,

    #[error("Vector search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Vector search API failed with status {0}")]
    Status(u16),

    #[error("Vector search API returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Accepts a bare list of match objects, or an object holding that list under
/// `matches`. Each match must itself be a JSON object.
fn parse_matches(body: Value) -> std::result::Result<Vec<VectorSearchMatch>, VectorSearchError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("matches") {
            Some(Value::Array(items)) => items,
            _ => return Err(invalid_response("expected an array under `matches`")),
        },
        _ => {
            return Err(invalid_response(
                "expected an array of matches or an object with `matches`",
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(invalid_response(format!("match {} is not an object", index)));
            }
            serde_json::from_value::<RawMatch>(item)
                .map(RawMatch::into_match)
                .map_err(|e| invalid_response(format!("match {}: {}", index, e)))
        })
        .collect()
}

fn invalid_response(message: impl Into<String>) -> VectorSearchError {
    VectorSearchError::InvalidResponse(message.into())
}

#[derive(Deserialize)]
struct RawMatch {
    id: String,
    score: f64,
    text: String,
    #[serde(default)]
    metadata: Value,
}

impl RawMatch {
    fn into_match(self) -> VectorSearchMatch {
        let metadata = match self.metadata {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        VectorSearchMatch {
            id: self.id,
            score: self.score,
            text: self.text,
            metadata,
        }
    }
}

/// Matches returned whenever the search service cannot be used.
pub fn placeholder_matches() -> Vec<VectorSearchMatch> {
    let placeholder = |id: &str, score: f64, text: &str| VectorSearchMatch {
        id: id.to_string(),
        score,
        text: text.to_string(),
        metadata: Map::from_iter([("source".to_string(), json!("placeholder"))]),
    };
    vec![
        placeholder(
            "doc_placeholder_1",
            0.99,
            "Replace runVectorSearch with your vector DB retrieval logic.",
        ),
        placeholder(
            "doc_placeholder_2",
            0.62,
            "This is a lower confidence chunk that may be filtered out.",
        ),
    ]
}

pub struct VectorSearchPlugin {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl VectorSearchPlugin {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Resolves the endpoint once, honouring `VECTOR_SEARCH_URL`.
    pub fn from_config(config: &VectorSearchConfig) -> Self {
        Self::new(
            config.resolve_url(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Queries the search service. Any deviation from the expected shape is an error.
    pub async fn fetch_vector_matches(
        &self,
        query: &str,
        top_k: u32,
    ) -> std::result::Result<Vec<VectorSearchMatch>, VectorSearchError> {
        if self.endpoint.is_empty() {
            return Err(VectorSearchError::NotConfigured);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&json!({ "query": query, "topK": top_k }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VectorSearchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let payload: Value =
            serde_json::from_slice(&body).map_err(|e| invalid_response(e.to_string()))?;
        parse_matches(payload)
    }

    /// Searches and filters by score. Never fails; falls back to placeholders.
    pub async fn run_vector_search(&self, input: &VectorSearchInput) -> VectorSearchResponse {
        let (provider, all_matches) = match self
            .fetch_vector_matches(&input.query, input.top_k)
            .await
        {
            Ok(matches) => {
                debug!("Vector search returned {} matches", matches.len());
                (VectorSearchProvider::Api, matches)
            }
            Err(e) => {
                warn!("Vector search unavailable, using placeholder matches: {}", e);
                (VectorSearchProvider::Placeholder, placeholder_matches())
            }
        };

        let matches: Vec<VectorSearchMatch> = all_matches
            .into_iter()
            .filter(|m| m.score >= input.score_threshold)
            .collect();
        let text_chunks = matches.iter().map(|m| m.text.clone()).collect();

        VectorSearchResponse {
            provider,
            query: input.query.clone(),
            top_k: input.top_k,
            score_threshold: input.score_threshold,
            matches,
            text_chunks,
        }
    }
}

#[async_trait]
impl Plugin for VectorSearchPlugin {
    fn name(&self) -> &str {
        "vectorSearch"
    }

    fn description(&self) -> &str {
        "Searches the knowledge base for semantically relevant documents."
    }

    fn parameter_schema(&self) -> Value {
        schema_for::<VectorSearchInput>()
    }

    async fn execute(&self, input: Value) -> Result<PluginOutput> {
        let params: VectorSearchInput = input::parse(input)?;
        params.validate()?;
        let response = self.run_vector_search(&params).await;
        PluginOutput::json(&response)
    }
}
