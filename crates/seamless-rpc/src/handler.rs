//! Request handlers.

use crate::server::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use seamless_core::config::ProtocolConfig;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// RPC endpoint.
///
/// Always answers 200: success and failure are both carried in the envelope.
pub async fn handle_rpc(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    debug!("RPC request ({} bytes)", body.len());

    let report = state.dispatcher.dispatch(&body, &state.context).await;
    state.call_log.record(&report);
    let text = state.dispatcher.encode_response(&report.response);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, ProtocolConfig::CONTENT_TYPE)],
        text,
    )
}

pub async fn handle_logs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.call_log.entries())
}

pub async fn handle_clear_logs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.call_log.clear();
    debug!("Call log cleared");
    StatusCode::NO_CONTENT
}

pub async fn handle_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.call_log.stats())
}

/// Identities currently registered with the dispatcher.
pub async fn handle_functions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "functions": state.dispatcher.registry().list_registered() }))
}
