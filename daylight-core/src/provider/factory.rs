//! Provider factory for creating LLM providers based on configuration.

use super::types::*;
use super::GeminiProvider;
use crate::config::LlmConfig;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

/// Creates a provider instance based on configuration.
///
/// Supported providers:
/// - `"gemini"` (alias `"google"`) - Google Generative Language API
pub fn create_provider(
    config: &LlmConfig,
    client: Client,
    api_key: String,
) -> Result<Arc<dyn Provider>> {
    let provider_type = config.provider.to_lowercase();

    match provider_type.as_str() {
        "gemini" | "google" => {
            debug!("Using Gemini provider with model: {}", config.model);
            Ok(Arc::new(GeminiProvider::with_client(client, config, api_key)))
        }
        _ => Err(ProviderError::Other(format!(
            "Unknown provider type: {}. Supported: gemini",
            provider_type
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_gemini_provider() {
        let config = LlmConfig {
            provider: "Google".to_string(),
            ..Default::default()
        };
        let provider = create_provider(&config, Client::new(), "key".into()).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn rejects_unknown_provider() {
        let config = LlmConfig {
            provider: "ollama".to_string(),
            ..Default::default()
        };
        let err = create_provider(&config, Client::new(), "key".into())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unknown provider type: ollama"));
    }
}
