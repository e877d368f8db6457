//! # Scenery Companion Server Library
//!
//! Router and handlers for the local development companion: a
//! single-slot document store the editor mirrors to while developing
//! against a loopback host.
//!
//! - `GET /api/config` returns the stored document, or JSON `null` when
//!   the slot is empty.
//! - `POST /api/config` replaces the slot with the request body.
//!
//! There is no id parameter; the slot holds exactly one document.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct CompanionState {
    config_path: Arc<PathBuf>,
}

impl CompanionState {
    /// Create state around the single-slot config file path.
    #[must_use]
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Arc::new(config_path.into()),
        }
    }

    /// The config file path.
    #[must_use]
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}

/// Build the companion router.
///
/// CORS is fully permissive: the companion serves every device on the
/// local network during development.
#[must_use]
pub fn router(state: CompanionState) -> Router {
    Router::new()
        .route("/api/config", get(get_config).post(set_config))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /api/config` - read the slot.
async fn get_config(State(state): State<CompanionState>) -> (StatusCode, Json<Value>) {
    match tokio::fs::read_to_string(state.config_path.as_ref()).await {
        Ok(contents) => match serde_json::from_str::<Value>(&contents) {
            Ok(config) => (StatusCode::OK, Json(config)),
            Err(e) => {
                tracing::error!("stored config is not valid JSON: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "config could not be read" })),
                )
            }
        },
        // An empty slot is not an error.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::OK, Json(Value::Null))
        }
        Err(e) => {
            tracing::error!("failed to read config file: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "config could not be read" })),
            )
        }
    }
}

/// `POST /api/config` - replace the slot.
async fn set_config(
    State(state): State<CompanionState>,
    Json(config): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let pretty = match serde_json::to_string_pretty(&config) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("failed to serialize config body: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "config could not be saved" })),
            );
        }
    };

    match tokio::fs::write(state.config_path.as_ref(), pretty).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "success": true, "message": "config saved" })),
        ),
        Err(e) => {
            tracing::error!("failed to write config file: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "config could not be saved" })),
            )
        }
    }
}
