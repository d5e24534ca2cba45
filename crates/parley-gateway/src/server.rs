// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router construction and the HTTP server loop.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use parley_agent::TurnService;
use parley_config::model::GatewayConfig;
use parley_core::ParleyError;
use parley_storage::PersistenceGateway;

use crate::handlers;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct GatewayState {
    pub service: Arc<TurnService>,
    pub gateway: Arc<PersistenceGateway>,
    pub version: String,
}

impl GatewayState {
    pub fn new(service: Arc<TurnService>) -> Self {
        let gateway = service.gateway().clone();
        Self {
            service,
            gateway,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Builds the application router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/chat", post(handlers::post_chat))
        .route(
            "/v1/conversations/{id}/messages",
            get(handlers::get_messages),
        )
        .route("/health", get(handlers::get_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds the configured address and serves until `shutdown` fires.
pub async fn serve(
    config: &GatewayConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), ParleyError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParleyError::Internal(format!("failed to bind {addr}: {e}")))?;

    info!(addr = %addr, "gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ParleyError::Internal(format!("server error: {e}")))?;

    info!("gateway stopped");
    Ok(())
}
