//! Application error taxonomy and the shared response envelope.
//!
//! Every error recovers locally at the handler boundary (spec §7): nothing
//! propagates past the HTTP/WS surface uncaught, and no variant here carries
//! partial state — a `?` that reaches a handler always means the store and
//! broadcast bridge were left untouched by the call that failed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed body, bad game id shape. 400-class, no state change.
    #[error("{0}")]
    Validation(String),

    /// Unknown game id. 404-class, no state change.
    #[error("not found")]
    NotFound,

    /// Game full, already started, not started, not enough players,
    /// duplicate name/token, invalid name/token. 400-class, no state change.
    /// `kind` is the wire-visible error tag from spec §6's endpoint table.
    #[error("{message}")]
    Precondition {
        kind: &'static str,
        message: String,
    },

    /// Concurrent mutation detected (lock held by another request). 409-class,
    /// client MAY retry.
    #[error("conflict")]
    Conflict,

    /// Store timeout or unreachable. 503-class, no state change, client MAY
    /// retry with backoff.
    #[error("transient: {0}")]
    Transient(String),

    /// Snapshot failed to deserialize. Logged, the game id is dropped from
    /// the store's index to prevent poisoning further reads, client sees
    /// `not_found` afterwards.
    #[error("fatal: {0}")]
    Fatal(String),

    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn precondition(kind: &'static str, message: impl Into<String>) -> Self {
        AppError::Precondition {
            kind,
            message: message.into(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation", msg.clone()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", "game not found".into()),
            AppError::Precondition { kind, message } => {
                (StatusCode::BAD_REQUEST, *kind, message.clone())
            }
            AppError::Conflict => (
                StatusCode::CONFLICT,
                "conflict",
                "concurrent mutation detected, retry".into(),
            ),
            AppError::Transient(msg) => (StatusCode::SERVICE_UNAVAILABLE, "transient", msg.clone()),
            AppError::Fatal(msg) => {
                tracing::error!("fatal store error: {msg}");
                (StatusCode::NOT_FOUND, "not_found", "game not found".into())
            }
            AppError::Redis(e) => {
                tracing::error!("redis error: {e:?}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "transient",
                    "store unavailable".into(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "internal error".into(),
                )
            }
        };

        (status, Json(json!({ "success": false, "error": kind, "message": message }))).into_response()
    }
}

/// Wrap a successful payload in the shared `{success, data}` envelope.
pub fn ok<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Same as [`ok`] but with an additional human-readable message.
pub fn ok_with_message<T: Serialize>(message: impl Into<String>, data: T) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "message": message.into(), "data": data }))
}
