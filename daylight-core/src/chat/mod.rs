//! Chat turns: UI message conversion, the tool-calling loop and stream smoothing.

mod events;
mod manager;
mod messages;
mod smooth;

pub use events::StreamEvent;
pub use manager::{ChatError, ChatManager, ChatOutcome, ToolInvocation};
pub use messages::{convert_ui_messages, Conversation, UiMessage, UiRole};
pub use smooth::smooth_stream;
