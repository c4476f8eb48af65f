use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::prompts::Scenario;

/// Environment variable consulted first for the provider API key.
pub const API_KEY_ENV: &str = "GOOGLE_GENERATIVE_AI_API_KEY";
/// Fallback environment variable for the provider API key.
pub const API_KEY_FALLBACK_ENV: &str = "GOOGLE_API_KEY";
/// Environment variable overriding the knowledge-base endpoint.
pub const VECTOR_SEARCH_URL_ENV: &str = "VECTOR_SEARCH_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for the support assistant.
///
/// Every section has defaults, so an empty YAML document is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Prompt scenarios combined into the chat system prompt.
    #[serde(default = "default_scenarios")]
    pub prompt_scenarios: Vec<Scenario>,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_scenarios() -> Vec<Scenario> {
    vec![Scenario::Support, Scenario::ShippingReturns]
}

/// Configuration for the hosted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider type, currently only "gemini"
    pub provider: String,
    pub model: String,
    pub base_url: String,
    /// Takes precedence over the API key environment variables when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum model calls per chat turn, tool round-trips included.
    pub max_steps: usize,
}

impl LlmConfig {
    /// Resolves the API key from config, then `GOOGLE_GENERATIVE_AI_API_KEY`,
    /// then `GOOGLE_API_KEY`. Returns `None` when the result is blank.
    pub fn resolve_api_key(&self) -> Option<String> {
        pick_api_key(
            self.api_key.as_deref(),
            std::env::var(API_KEY_ENV).ok(),
            std::env::var(API_KEY_FALLBACK_ENV).ok(),
        )
    }
}

/// The primary variable wins whenever it is set, even if empty.
fn pick_api_key(
    configured: Option<&str>,
    primary: Option<String>,
    fallback: Option<String>,
) -> Option<String> {
    let raw = match configured {
        Some(key) => key.to_string(),
        None => primary.or(fallback).unwrap_or_default(),
    };
    let key = raw.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to
    pub bind: String,
}

/// How streamed text is re-chunked before it reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chunking {
    Word,
    Line,
    /// Forward provider deltas untouched
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Delay between smoothed chunks, in milliseconds
    pub delay_ms: u64,
    pub chunking: Chunking,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub vector_search: VectorSearchConfig,
    pub web_search: WebSearchConfig,
}

/// Knowledge-base endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSearchConfig {
    pub enabled: bool,
    pub url: String,
    pub timeout_ms: u64,
}

impl VectorSearchConfig {
    /// Endpoint to query: `VECTOR_SEARCH_URL` when set and non-empty, else `url`.
    pub fn resolve_url(&self) -> String {
        pick_url(std::env::var(VECTOR_SEARCH_URL_ENV).ok(), &self.url)
    }
}

fn pick_url(env: Option<String>, configured: &str) -> String {
    env.filter(|url| !url.is_empty())
        .unwrap_or_else(|| configured.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub enabled: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            temperature: None,
            max_steps: 5,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            delay_ms: 20,
            chunking: Chunking::Word,
        }
    }
}

impl Default for VectorSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://172.24.2.23:8000/query".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt_scenarios: default_scenarios(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
            stream: StreamConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `config.yaml` in the working directory, then from
    /// `<config dir>/daylight/config.yaml`, otherwise use defaults.
    pub fn load_or_default() -> Self {
        Self::search_paths()
            .into_iter()
            .find(|path| path.exists())
            .and_then(|path| match Self::load(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("Ignoring config at {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default()
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.yaml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("daylight").join("config.yaml"));
        }
        paths
    }

    /// Create a new Config with default values and builder-style configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.llm.model = model.into();
        self
    }

    /// Set the base URL of the provider API.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.llm.base_url = url.into();
        self
    }

    /// Set the provider API key, bypassing the environment.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.llm.api_key = Some(key.into());
        self
    }

    /// Set the temperature (0.0-2.0).
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.llm.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of model calls per chat turn.
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.llm.max_steps = steps;
        self
    }

    /// Set the prompt scenarios for the chat system prompt.
    pub fn with_scenarios(mut self, scenarios: Vec<Scenario>) -> Self {
        self.prompt_scenarios = scenarios;
        self
    }

    /// Set the server bind address.
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.server.bind = bind.into();
        self
    }

    /// Configure stream smoothing.
    pub fn with_stream_config(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    /// Set the knowledge-base endpoint.
    pub fn with_vector_search_url(mut self, url: impl Into<String>) -> Self {
        self.tools.vector_search.url = url.into();
        self
    }

    /// Configure tool settings.
    pub fn with_tools_config(mut self, tools: ToolsConfig) -> Self {
        self.tools = tools;
        self
    }
}
