//! Axum-based webhook channel.
//!
//! Lex (or an API Gateway in front of it) posts each event to the configured
//! route.  The body is handed to [`Flex::respond`] untouched; the reply's
//! status and JSON body are written back as-is.
//!
//! ```text
//! POST <route>        → Lex event in, dialog action out
//! GET  /health        → 200 "ok"
//! ```

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapter::Flex;
use crate::config::ServerConfig;
use crate::error::AppError;

/// Router state injected into every handler.  Cheap to clone.
#[derive(Clone)]
struct ServerState {
    flex: Arc<Flex>,
}

pub fn build_router(flex: Arc<Flex>, route: &str) -> Router {
    Router::new()
        .route(route, post(webhook))
        .route("/health", get(|| async { "ok" }))
        .with_state(ServerState { flex })
}

async fn webhook(State(state): State<ServerState>, body: Bytes) -> Response {
    let reply = state.flex.respond(&body);
    let status = StatusCode::from_u16(reply.status).unwrap_or_else(|_| {
        warn!(status = reply.status, "adapter returned an invalid status code");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    if reply.body.is_empty() {
        return status.into_response();
    }
    (status, [(header::CONTENT_TYPE, "application/json")], reply.body).into_response()
}

/// Serve the webhook until `shutdown` is cancelled.
pub async fn serve(
    flex: Arc<Flex>,
    config: &ServerConfig,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let router = build_router(flex, &config.route);

    let listener = TcpListener::bind(&config.bind)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {}: {e}", config.bind)))?;

    info!(bind = %config.bind, route = %config.route, "lex webhook listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("axum server error: {e}")))?;

    info!("lex webhook shut down");
    Ok(())
}
