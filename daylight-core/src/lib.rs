//! daylight-core - support assistant engine
//!
//! Provides the components behind the Daylight chat widget:
//! - Configuration management
//! - Prompt templates
//! - LLM integration (Gemini) with tool calling
//! - Chat turns streamed in the UI message protocol
//! - Sentiment and priority triage
//! - HTTP server (primary interface)

pub mod chat;
pub mod config;
pub mod prompts;
pub mod provider;
pub mod sentiment;
pub mod server;

pub use chat::{ChatManager, ChatOutcome, StreamEvent};
pub use config::{Config, StreamConfig, ToolsConfig, VectorSearchConfig, WebSearchConfig};
pub use prompts::{build_prompt, Scenario};
pub use provider::Provider;
pub use sentiment::{SentimentAnalysis, SentimentAnalyzer};
pub use server::Server;
