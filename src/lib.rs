//! daylight - customer-support chat backend
//!
//! Re-exports the workspace crates so applications can depend on a single crate:
//! - `daylight_core`: configuration, prompts, the Gemini provider, the chat tool
//!   loop, sentiment triage and the HTTP server
//! - `daylight_plugin`: the tool trait and registry
//! - `daylight_std` (default `std` feature): the built-in knowledge-base and web
//!   search tools

pub use daylight_core;
pub use daylight_plugin;

#[cfg(feature = "std")]
pub use daylight_std;

pub use daylight_core::{ChatManager, Config, SentimentAnalyzer, Server};
pub use daylight_plugin::{Plugin, PluginError, PluginOutput, PluginRegistry};

/// Builds a registry holding every built-in tool, configured from `config`.
#[cfg(feature = "std")]
pub fn default_registry(config: &Config) -> PluginRegistry {
    daylight_std::default_registry(&config.tools)
}
