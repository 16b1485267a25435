//! HTTP server implementation using Axum.

use crate::call_log::CallLog;
use crate::handler::{
    handle_clear_logs, handle_functions, handle_health, handle_logs, handle_rpc, handle_stats,
};
use axum::{
    routing::{get, post},
    Router,
};
use seamless_core::config::ProtocolConfig;
use seamless_core::{CallContext, Dispatcher};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    /// Context handed to every dispatched call.
    pub context: CallContext,
    pub call_log: CallLog,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, context: CallContext) -> Self {
        Self {
            dispatcher,
            context,
            call_log: CallLog::new(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    // Open CORS for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route(ProtocolConfig::RPC_ENDPOINT, post(handle_rpc))
        .route("/dev/rpc/logs", get(handle_logs).delete(handle_clear_logs))
        .route("/dev/rpc/stats", get(handle_stats))
        .route("/dev/rpc/functions", get(handle_functions))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the development server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
