//! Google Gemini provider over the Generative Language REST API.
//!
//! Chat uses `streamGenerateContent` with server-sent events; structured output
//! uses `generateContent` with a JSON response schema.

use super::types::*;
use crate::config::LlmConfig;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), config, api_key)
    }

    /// Create a provider sharing an existing HTTP client.
    pub fn with_client(client: Client, config: &LlmConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post(&self, url: String, body: &GenerateContentRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn chat(
        &self,
        request: ChatRequest,
        callback: &mut (dyn FnMut(ChatChunk) + Send),
    ) -> Result<()> {
        let url = format!(
            "{}?alt=sse",
            self.endpoint(&request.model, "streamGenerateContent")
        );
        let body = GenerateContentRequest::from_chat(&request);
        debug!(
            "Gemini chat: model={} messages={} tools={}",
            request.model,
            request.messages.len(),
            request.tools.len()
        );

        let response = self.post(url, &body).await?;
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::default();
        let mut finish_reason = None;

        while let Some(bytes) = stream.next().await {
            let bytes = bytes?;
            for data in decoder.push(&bytes) {
                dispatch_event(&data, callback, &mut finish_reason)?;
            }
        }
        if let Some(data) = decoder.finish() {
            dispatch_event(&data, callback, &mut finish_reason)?;
        }

        callback(ChatChunk::Finish {
            reason: finish_reason,
        });
        Ok(())
    }

    async fn generate_object(&self, request: ObjectRequest) -> Result<Value> {
        let url = self.endpoint(&request.model, "generateContent");
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![WirePart::text(request.prompt)],
            }],
            system_instruction: request.system.map(Content::system),
            tools: Vec::new(),
            generation_config: Some(GenerationConfig {
                temperature: None,
                response_mime_type: Some("application/json".to_string()),
                response_json_schema: Some(request.schema),
            }),
        };

        let response: GenerateContentResponse = self.post(url, &body).await?.json().await?;
        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|part| !part.thought.unwrap_or(false))
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Handles one SSE `data:` payload.
fn dispatch_event(
    data: &str,
    callback: &mut (dyn FnMut(ChatChunk) + Send),
    finish_reason: &mut Option<String>,
) -> Result<()> {
    let value: Value = serde_json::from_str(data)?;
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(ProviderError::Other(format!("Gemini stream error: {}", message)));
    }

    let response: GenerateContentResponse = serde_json::from_value(value)?;
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Ok(());
    };

    if let Some(content) = candidate.content {
        for part in content.parts {
            if part.thought.unwrap_or(false) {
                continue;
            }
            if let Some(text) = part.text {
                if !text.is_empty() {
                    callback(ChatChunk::TextDelta(text));
                }
            }
            if let Some(call) = part.function_call {
                callback(ChatChunk::ToolCall(ToolCall {
                    id: call.id.unwrap_or_else(new_call_id),
                    name: call.name,
                    args: if call.args.is_null() {
                        Value::Object(Default::default())
                    } else {
                        call.args
                    },
                }));
            }
        }
    }

    if candidate.finish_reason.is_some() {
        *finish_reason = candidate.finish_reason;
    }
    Ok(())
}

fn new_call_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("call_{}", &id[..12])
}

/// Incremental decoder for `text/event-stream` bodies.
///
/// Bytes are buffered until a blank line closes an event, so multi-byte
/// characters split across network chunks decode correctly.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feeds bytes and returns the data payloads of every completed event.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend(bytes.iter().filter(|&&b| b != b'\r'));

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(data) = event_data(&raw) {
                events.push(data);
            }
        }
        events
    }

    /// Returns the payload of a trailing event the stream ended without terminating.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buffer);
        event_data(&raw)
    }
}

fn event_data(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if data.is_empty() {
        return None;
    }
    let joined = data.join("\n");
    if joined.trim().is_empty() || joined.trim() == "[DONE]" {
        None
    } else {
        Some(joined)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDeclarations>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    fn from_chat(request: &ChatRequest) -> Self {
        let contents = request
            .messages
            .iter()
            .filter_map(Content::from_message)
            .collect();

        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![ToolDeclarations {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|tool| FunctionDeclaration {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters_json_schema: tool.parameters.clone(),
                    })
                    .collect(),
            }]
        };

        Self {
            contents,
            system_instruction: request.system.clone().map(Content::system),
            tools,
            generation_config: request.temperature.map(|temperature| GenerationConfig {
                temperature: Some(temperature),
                response_mime_type: None,
                response_json_schema: None,
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

impl Content {
    fn system(text: String) -> Self {
        Self {
            role: None,
            parts: vec![WirePart::text(text)],
        }
    }

    fn from_message(message: &Message) -> Option<Self> {
        let role = match message.role {
            Role::User | Role::Tool => "user",
            Role::Assistant => "model",
        };

        let parts: Vec<WirePart> = message
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } if text.is_empty() => None,
                Part::Text { text } => Some(WirePart::text(text.clone())),
                Part::ToolCall(call) => Some(WirePart {
                    function_call: Some(FunctionCall {
                        id: None,
                        name: call.name.clone(),
                        args: call.args.clone(),
                    }),
                    ..Default::default()
                }),
                Part::ToolResult(result) => Some(WirePart {
                    function_response: Some(FunctionResponse {
                        name: result.name.clone(),
                        response: as_struct(&result.output),
                    }),
                    ..Default::default()
                }),
            })
            .collect();

        if parts.is_empty() {
            warn!("Skipping empty {:?} message", message.role);
            return None;
        }
        Some(Self {
            role: Some(role.to_string()),
            parts,
        })
    }
}

/// Function responses must be JSON objects.
fn as_struct(output: &Value) -> Value {
    if output.is_object() {
        output.clone()
    } else {
        serde_json::json!({ "result": output })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl WirePart {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters_json_schema: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_json_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}
