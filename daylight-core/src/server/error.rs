use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub const MISSING_API_KEY: &str = "Missing Google API key. Set GOOGLE_GENERATIVE_AI_API_KEY or GOOGLE_API_KEY in .env.local and restart the server.";

/// Errors returned to HTTP clients as JSON bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", MISSING_API_KEY)]
    MissingApiKey,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),

    /// Sentiment analysis failed for any reason after the key check.
    #[error("Failed to analyze sentiment and priority: {0}")]
    Sentiment(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MissingApiKey => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": MISSING_API_KEY }),
            ),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": message }),
            ),
            ApiError::Sentiment(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Failed to analyze sentiment and priority",
                    "message": message,
                }),
            ),
        };
        (status, Json(body)).into_response()
    }
}
