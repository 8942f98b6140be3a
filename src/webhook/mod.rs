//! HTTP listener for Notion change notifications.

pub mod payload;
pub mod signature;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use notion_gcal_core::trigger::{TriggerAck, TriggerHandle};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct WebhookState {
    trigger: TriggerHandle,
    secret: Option<Arc<str>>,
}

impl WebhookState {
    pub fn new(trigger: TriggerHandle, secret: Option<String>) -> Self {
        WebhookState {
            trigger,
            secret: secret.map(Arc::from),
        }
    }
}

pub fn router(path: &str, state: WebhookState) -> Router {
    Router::new()
        .route(path, post(notion_webhook))
        .route("/health", get(health))
        .with_state(state)
}

/// POST {path}
async fn notion_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = headers
        .get(signature::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if !signature::verify(state.secret.as_deref(), &body, header) {
        warn!(has_signature = header.is_some(), "Rejected webhook with bad signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload: Value = serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));
    let collection_id = state.trigger.collection_id();

    if !payload::references_collection(&payload, collection_id) {
        debug!("Webhook for a different database, ignoring");
        return (
            StatusCode::OK,
            Json(json!({"status": "ignored", "reason": "different_database"})),
        )
            .into_response();
    }

    match state.trigger.trigger(collection_id) {
        TriggerAck::Accepted | TriggerAck::Coalesced => {
            info!("Webhook accepted, sync queued");
            (StatusCode::ACCEPTED, Json(json!({"status": "accepted"}))).into_response()
        }
        TriggerAck::Ignored => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "unavailable"})),
        )
            .into_response(),
    }
}

/// GET|HEAD /health
async fn health() -> &'static str {
    "ok"
}
