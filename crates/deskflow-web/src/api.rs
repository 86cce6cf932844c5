//! REST API route handlers.
//!
//! Provides the command endpoint, action discovery and system status.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::{Value, json};

use deskflow_kernel::{ActionSchema, ErrorKind, ResultEnvelope};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /assistant
// ---------------------------------------------------------------------------

/// HTTP status for a dispatch result.
///
/// Handler-declared failures are reported with 200: the request was served
/// and the body carries the handler's own error.
pub fn status_for(envelope: &ResultEnvelope) -> StatusCode {
    match envelope.error_kind() {
        None | Some(ErrorKind::HandlerError) => StatusCode::OK,
        Some(ErrorKind::UnsupportedAction | ErrorKind::InvalidParameters) => {
            StatusCode::BAD_REQUEST
        }
        Some(ErrorKind::InternalError) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The non-blank `command` string of a request body.
fn command_of(body: &Value) -> Option<&str> {
    body.get("command")
        .and_then(Value::as_str)
        .filter(|c| !c.trim().is_empty())
}

/// Dispatch one command.
pub async fn assistant(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "unreadable request body");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "details": rejection.body_text(),
                })),
            );
        }
    };

    let Some(command) = command_of(&body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Command is required" })),
        );
    };

    let envelope = state.dispatcher.dispatch(command).await;
    (status_for(&envelope), Json(envelope.to_json()))
}

// ---------------------------------------------------------------------------
// GET /api/actions
// ---------------------------------------------------------------------------

/// One catalog entry.
#[derive(Serialize)]
pub struct ActionInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: ActionSchema,
}

/// List every registered action in catalog order.
pub async fn actions(State(state): State<Arc<AppState>>) -> Json<Vec<ActionInfo>> {
    let infos = state
        .dispatcher
        .registry()
        .specs()
        .map(|spec| ActionInfo {
            name: spec.name().as_str(),
            description: spec.description(),
            parameters: spec.schema().clone(),
        })
        .collect();
    Json(infos)
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Response payload for the `/api/status` endpoint.
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub action_count: usize,
    pub uptime_seconds: u64,
}

/// Return basic system status information.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        action_count: state.dispatcher.registry().len(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
