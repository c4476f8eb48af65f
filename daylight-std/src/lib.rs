//! Standard library tools for the Daylight assistant
//!
//! Built-in plugins the model can call during a chat turn:
//! - `vectorSearch`: knowledge-base retrieval with placeholder fallback
//! - `googleSearch`: web search placeholder

mod input;
mod vector_search;
mod web_search;

pub use vector_search::{
    placeholder_matches, VectorSearchError, VectorSearchInput, VectorSearchMatch,
    VectorSearchPlugin, VectorSearchProvider, VectorSearchResponse,
};
pub use web_search::{WebSearchInput, WebSearchItem, WebSearchPlugin, WebSearchResponse};

use daylight_core::ToolsConfig;
use daylight_plugin::PluginRegistry;
use tracing::debug;

/// Builds a registry with every enabled built-in tool.
pub fn default_registry(config: &ToolsConfig) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    if config.web_search.enabled {
        registry.register(WebSearchPlugin::new());
    }
    if config.vector_search.enabled {
        registry.register(VectorSearchPlugin::from_config(&config.vector_search));
    }
    debug!("Registered tools: {:?}", registry.names());
    registry
}
