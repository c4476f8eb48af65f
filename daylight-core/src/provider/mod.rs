//! LLM provider abstraction layer.
//!
//! This module defines a common interface for hosted model backends to provide
//! streaming chat completions with tool calls and schema-constrained JSON output.

mod factory;
pub mod gemini;
mod types;

// Re-export common types
pub use types::{
    ChatChunk, ChatRequest, Message, ObjectRequest, Part, Provider, ProviderError, Result, Role,
    Tool, ToolCall, ToolResult,
};

// Re-export provider implementations
pub use factory::create_provider;
pub use gemini::GeminiProvider;
