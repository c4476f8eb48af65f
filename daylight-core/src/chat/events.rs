use serde::Serialize;
use serde_json::Value;

/// One part of the UI message stream sent to the chat widget.
///
/// Serialized as `{"type": "<kebab-case>", ...camelCase fields}`, one JSON
/// object per server-sent event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum StreamEvent {
    Start { message_id: String },
    StartStep,
    TextStart { id: String },
    TextDelta { id: String, delta: String },
    TextEnd { id: String },
    ToolInputAvailable {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },
    ToolOutputAvailable { tool_call_id: String, output: Value },
    ToolOutputError { tool_call_id: String, error_text: String },
    FinishStep,
    Finish,
    Error { error_text: String },
}

/// Random identifier with a readable prefix, e.g. `msg_3f2a...`.
pub(crate) fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_wire_shape() {
        let event = StreamEvent::ToolInputAvailable {
            tool_call_id: "c1".into(),
            tool_name: "vectorSearch".into(),
            input: json!({"query": "q"}),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "tool-input-available",
                "toolCallId": "c1",
                "toolName": "vectorSearch",
                "input": {"query": "q"}
            })
        );
        assert_eq!(
            serde_json::to_value(StreamEvent::StartStep).unwrap(),
            json!({"type": "start-step"})
        );
        assert_eq!(
            serde_json::to_value(StreamEvent::Error {
                error_text: "boom".into()
            })
            .unwrap(),
            json!({"type": "error", "errorText": "boom"})
        );
    }
}
