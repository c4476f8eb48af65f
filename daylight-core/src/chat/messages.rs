//! Conversion from chat-widget UI messages to provider messages.
//!
//! The widget sends its whole message list on every turn. Assistant messages
//! carry typed parts: `text`, `step-start` between model steps, and
//! `tool-<name>` parts that record a tool call together with its output.

use crate::provider::{Message, Part, Role, ToolCall, ToolResult};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub role: UiRole,
    #[serde(default)]
    pub parts: Vec<Value>,
    /// Older clients send plain content instead of parts.
    #[serde(default)]
    pub content: Option<String>,
}

/// Provider-ready conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    /// Extra system text from system-role UI messages.
    pub system: Vec<String>,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn from_user_text(text: impl Into<String>) -> Self {
        Self {
            system: Vec::new(),
            messages: vec![Message::user(text)],
        }
    }
}

pub fn convert_ui_messages(ui_messages: &[UiMessage]) -> Conversation {
    let mut conversation = Conversation::default();

    for ui in ui_messages {
        match ui.role {
            UiRole::System => {
                let text = text_of(ui);
                if !text.is_empty() {
                    conversation.system.push(text);
                }
            }
            UiRole::User => {
                let parts = text_parts(ui);
                if !parts.is_empty() {
                    conversation.messages.push(Message::new(Role::User, parts));
                }
            }
            UiRole::Assistant => convert_assistant(ui, &mut conversation.messages),
        }
    }

    conversation
}

fn text_of(ui: &UiMessage) -> String {
    if ui.parts.is_empty() {
        return ui.content.clone().unwrap_or_default();
    }
    ui.parts
        .iter()
        .filter(|part| part_type(part) == Some("text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One text part per UI text part; empty texts are skipped.
fn text_parts(ui: &UiMessage) -> Vec<Part> {
    let texts: Vec<String> = if ui.parts.is_empty() {
        ui.content.iter().cloned().collect()
    } else {
        ui.parts
            .iter()
            .filter(|part| part_type(part) == Some("text"))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    };
    texts
        .into_iter()
        .filter(|text| !text.is_empty())
        .map(|text| Part::Text { text })
        .collect()
}

fn part_type(part: &Value) -> Option<&str> {
    part.get("type").and_then(Value::as_str)
}

/// Emits one assistant message (and one tool-result message) per model step.
fn convert_assistant(ui: &UiMessage, out: &mut Vec<Message>) {
    if ui.parts.is_empty() {
        if let Some(content) = ui.content.as_deref().filter(|c| !c.is_empty()) {
            out.push(Message::assistant(content));
        }
        return;
    }

    let mut step_parts = Vec::new();
    let mut step_results = Vec::new();

    for part in &ui.parts {
        match part_type(part) {
            Some("step-start") => flush_step(&mut step_parts, &mut step_results, out),
            Some("text") => {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    if !text.is_empty() {
                        step_parts.push(Part::Text {
                            text: text.to_string(),
                        });
                    }
                }
            }
            Some(kind) => {
                if let Some((call, result)) = completed_tool(kind, part) {
                    step_parts.push(Part::ToolCall(call));
                    step_results.push(Part::ToolResult(result));
                }
            }
            None => {}
        }
    }
    flush_step(&mut step_parts, &mut step_results, out);
}

fn flush_step(parts: &mut Vec<Part>, results: &mut Vec<Part>, out: &mut Vec<Message>) {
    if !parts.is_empty() {
        out.push(Message::new(Role::Assistant, std::mem::take(parts)));
    }
    if !results.is_empty() {
        out.push(Message::new(Role::Tool, std::mem::take(results)));
    }
}

/// Returns the call and its result for a tool part that finished running.
fn completed_tool(kind: &str, part: &Value) -> Option<(ToolCall, ToolResult)> {
    let name = match kind.strip_prefix("tool-") {
        Some(name) => name.to_string(),
        None if kind == "dynamic-tool" => part.get("toolName")?.as_str()?.to_string(),
        None => return None,
    };
    let id = part.get("toolCallId")?.as_str()?.to_string();

    let output = match part.get("state").and_then(Value::as_str)? {
        "output-available" => part.get("output").cloned().unwrap_or(Value::Null),
        "output-error" => serde_json::json!({
            "error": part.get("errorText").and_then(Value::as_str).unwrap_or("Tool execution failed"),
        }),
        _ => return None,
    };

    let call = ToolCall {
        id: id.clone(),
        name: name.clone(),
        args: part
            .get("input")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
    };
    Some((call, ToolResult { id, name, output }))
}
