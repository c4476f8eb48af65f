//! HTTP server for the chat widget.
//!
//! The server is organized into separate concerns:
//! - `handler`: route handlers and shared state
//! - `error`: JSON error responses

mod error;
mod handler;

pub use error::{ApiError, MISSING_API_KEY};
pub use handler::AppState;

use crate::config::Config;
use crate::provider::Provider;
use axum::routing::{get, post};
use axum::Router;
use daylight_plugin::PluginRegistry;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main server wiring configuration, tools and routes together.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// The provider is created per request from the API key in the environment,
    /// so the server starts even when no key is configured yet.
    pub fn new(config: Config, registry: PluginRegistry) -> Self {
        Self {
            state: AppState {
                config: Arc::new(config),
                registry: Arc::new(registry),
                client: reqwest::Client::new(),
                provider: None,
            },
        }
    }

    /// Uses a fixed provider instead of resolving one per request.
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.state.provider = Some(provider);
        self
    }

    /// Builds the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(handler::health))
            .route("/api/chat", post(handler::chat))
            .route("/api/sentiment", post(handler::sentiment))
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Binds the configured address and serves until Ctrl-C.
    pub async fn start(&self) -> Result<(), ServerError> {
        let bind = &self.state.config.server.bind;
        let listener = TcpListener::bind(bind).await?;

        info!("Daylight support server listening on http://{}", listener.local_addr()?);
        info!(
            "Model: {} | tools: {}",
            self.state.config.llm.model,
            self.state.registry.names().join(", ")
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                let _ = signal::ctrl_c().await;
                info!("Shutting down...");
            })
            .await?;

        Ok(())
    }
}
