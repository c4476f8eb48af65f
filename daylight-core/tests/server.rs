use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use daylight_core::config::{Chunking, StreamConfig};
use daylight_core::provider::{
    ChatChunk, ChatRequest, ObjectRequest, Provider, ProviderError, Result, ToolCall,
};
use daylight_core::server::MISSING_API_KEY;
use daylight_core::{Config, Server};
use daylight_plugin::{Plugin, PluginOutput, PluginRegistry};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Answers chat calls by first asking for the knowledge base, then replying.
struct FakeGemini {
    chat_calls: Mutex<usize>,
    object: Value,
}

impl FakeGemini {
    fn new(object: Value) -> Arc<Self> {
        Arc::new(Self {
            chat_calls: Mutex::new(0),
            object,
        })
    }
}

#[async_trait]
impl Provider for FakeGemini {
    fn name(&self) -> &str {
        "fake"
    }

    async fn chat(
        &self,
        _request: ChatRequest,
        callback: &mut (dyn FnMut(ChatChunk) + Send),
    ) -> Result<()> {
        let call = {
            let mut calls = self.chat_calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if call == 1 {
            callback(ChatChunk::ToolCall(ToolCall {
                id: "call_1".into(),
                name: "vectorSearch".into(),
                args: json!({"query": "return policy"}),
            }));
        } else {
            callback(ChatChunk::TextDelta("Returns are free within 30 days.".into()));
        }
        callback(ChatChunk::Finish {
            reason: Some("STOP".into()),
        });
        Ok(())
    }

    async fn generate_object(&self, _request: ObjectRequest) -> Result<Value> {
        if self.object.is_null() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(self.object.clone())
    }
}

struct StubKnowledgeBase;

#[async_trait]
impl Plugin for StubKnowledgeBase {
    fn name(&self) -> &str {
        "vectorSearch"
    }

    fn description(&self) -> &str {
        "Searches the knowledge base for semantically relevant documents."
    }

    fn parameter_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn execute(&self, _input: Value) -> daylight_plugin::Result<PluginOutput> {
        Ok(PluginOutput::new(json!({"textChunks": ["30-day free returns"]})))
    }
}

fn config() -> Config {
    Config::default().with_stream_config(StreamConfig {
        delay_ms: 0,
        chunking: Chunking::Word,
    })
}

fn app_with(provider: Arc<FakeGemini>) -> Router {
    let mut registry = PluginRegistry::new();
    registry.register(StubKnowledgeBase);
    Server::new(config(), registry)
        .with_provider(provider)
        .router()
}

/// A server whose API key resolves to blank regardless of the environment.
fn app_without_key() -> Router {
    Server::new(config().with_api_key("   "), PluginRegistry::new()).router()
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn sse_events(body: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(body)
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = app_without_key()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn chat_streams_ui_message_protocol() {
    let body = json!({
        "messages": [
            {"id": "m1", "role": "user", "parts": [{"type": "text", "text": "What is your return policy?"}]}
        ]
    });
    let response = app_with(FakeGemini::new(Value::Null))
        .oneshot(post("/api/chat", body.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["x-vercel-ai-ui-message-stream"],
        "v1"
    );
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let events = sse_events(&body_bytes(response).await);
    assert_eq!(events.last().map(String::as_str), Some("[DONE]"));

    let parsed: Vec<Value> = events[..events.len() - 1]
        .iter()
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();
    let types: Vec<&str> = parsed.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(types.first(), Some(&"start"));
    assert_eq!(types.last(), Some(&"finish"));
    assert!(types.contains(&"tool-input-available"));

    let output = parsed
        .iter()
        .find(|e| e["type"] == "tool-output-available")
        .unwrap();
    assert_eq!(output["toolCallId"], "call_1");
    assert_eq!(output["output"]["textChunks"][0], "30-day free returns");

    let text: String = parsed
        .iter()
        .filter(|e| e["type"] == "text-delta")
        .map(|e| e["delta"].as_str().unwrap())
        .collect();
    assert_eq!(text, "Returns are free within 30 days.");
    let deltas = parsed.iter().filter(|e| e["type"] == "text-delta").count();
    assert!(deltas > 1, "text should be smoothed into words");
}

#[tokio::test]
async fn chat_without_api_key_fails_fast() {
    let response = app_without_key()
        .oneshot(post("/api/chat", r#"{"messages": []}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({"error": MISSING_API_KEY}));
}

#[tokio::test]
async fn chat_rejects_malformed_body() {
    let response = app_with(FakeGemini::new(Value::Null))
        .oneshot(post("/api/chat", "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid chat request"));
}

#[tokio::test]
async fn sentiment_returns_analysis() {
    let analysis = json!({
        "sentiment": "negative",
        "priority": "high",
        "summary": "Frames arrived scratched; wants a replacement.",
        "signals": ["damaged item", "second contact"]
    });
    let body = json!({"conversationHistory": [{"role": "user", "content": "My frames are scratched again."}]});
    let response = app_with(FakeGemini::new(analysis.clone()))
        .oneshot(post("/api/sentiment", body.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"analysis": analysis}));
}

#[tokio::test]
async fn sentiment_failures_are_reported() {
    let response = app_with(FakeGemini::new(Value::Null))
        .oneshot(post("/api/sentiment", "[]"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Failed to analyze sentiment and priority");
    assert_eq!(body["message"], "Provider returned no content");

    let response = app_with(FakeGemini::new(json!({"sentiment": "neutral"})))
        .oneshot(post("/api/sentiment", "oops"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"],
        "Failed to analyze sentiment and priority"
    );
}

#[tokio::test]
async fn sentiment_without_api_key_fails_fast() {
    let response = app_without_key()
        .oneshot(post("/api/sentiment", "[]"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({"error": MISSING_API_KEY}));
}
