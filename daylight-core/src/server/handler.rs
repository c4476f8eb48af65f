//! Route handlers and shared state.

use super::error::ApiError;
use crate::chat::{convert_ui_messages, smooth_stream, ChatManager, StreamEvent, UiMessage};
use crate::config::Config;
use crate::provider::{create_provider, Provider};
use crate::sentiment::{conversation_history, SentimentAnalyzer};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderName;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use daylight_plugin::PluginRegistry;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

const UI_STREAM_HEADER: &str = "x-vercel-ai-ui-message-stream";

#[derive(Clone)]
pub struct AppState {
    pub(crate) config: Arc<Config>,
    pub(crate) registry: Arc<PluginRegistry>,
    pub(crate) client: reqwest::Client,
    /// Fixed provider; when unset one is built per request from the API key.
    pub(crate) provider: Option<Arc<dyn Provider>>,
}

impl AppState {
    /// Resolves the provider for a request. The API key is read on every call so
    /// a key added to the environment takes effect without a restart.
    fn provider(&self) -> Result<Arc<dyn Provider>, ApiError> {
        if let Some(provider) = &self.provider {
            return Ok(Arc::clone(provider));
        }
        let api_key = self
            .config
            .llm
            .resolve_api_key()
            .ok_or(ApiError::MissingApiKey)?;
        create_provider(&self.config.llm, self.client.clone(), api_key)
            .map_err(|e| ApiError::Internal(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    messages: Vec<UiMessage>,
}

/// `POST /api/chat`: streams the assistant turn as server-sent events.
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let provider = state.provider()?;

    let payload: ChatBody = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid chat request: {}", e)))?;
    debug!("Incoming chat messages: {}", String::from_utf8_lossy(&body));

    let conversation = convert_ui_messages(&payload.messages);
    debug!("Converted conversation: {:?}", conversation);
    info!("Chat request with {} messages", conversation.messages.len());

    let manager = ChatManager::new(&state.config, provider, Arc::clone(&state.registry));
    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        if let Err(e) = manager.stream(conversation, raw_tx).await {
            error!("Chat turn failed: {}", e);
        }
    });
    tokio::spawn(smooth_stream(raw_rx, out_tx, state.config.stream.clone()));

    let sse = Sse::new(event_stream(out_rx));
    Ok(([(HeaderName::from_static(UI_STREAM_HEADER), "v1")], sse).into_response())
}

/// Serializes events as SSE frames and terminates with `[DONE]`.
fn event_stream(
    receiver: mpsc::UnboundedReceiver<StreamEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let events = stream::unfold(receiver, |mut receiver| async move {
        receiver.recv().await.map(|event| (event, receiver))
    })
    .map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|e| {
            json!({ "type": "error", "errorText": e.to_string() }).to_string()
        });
        Ok(Event::default().data(data))
    });

    events.chain(stream::once(async { Ok(Event::default().data("[DONE]")) }))
}

/// `POST /api/sentiment`: classifies a conversation's sentiment and priority.
pub async fn sentiment(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let provider = state.provider()?;

    let payload: Value =
        serde_json::from_slice(&body).map_err(|e| ApiError::Sentiment(e.to_string()))?;
    let history = conversation_history(payload);

    let analyzer = SentimentAnalyzer::new(provider, state.config.llm.model.clone());
    let analysis = analyzer.analyze(&history).await.map_err(|e| {
        error!("Sentiment analysis failed: {}", e);
        ApiError::Sentiment(e.to_string())
    })?;

    info!(
        "Sentiment analysis: {:?} / {:?}",
        analysis.sentiment, analysis.priority
    );
    Ok(Json(json!({ "analysis": analysis })))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
