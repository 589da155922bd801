// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use switchboard_core::{StorageAdapter, SwitchboardError, TokenVerifier};
use switchboard_delivery::{CustomerMessages, WebhookIngestor};
use switchboard_fanout::LocalHub;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::{handlers, webhook, ws};

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub storage: Arc<dyn StorageAdapter>,
    pub ingestor: Arc<WebhookIngestor>,
    pub customers: Arc<CustomerMessages>,
    pub hub: Arc<LocalHub>,
    /// Real-time token verifier. `None` rejects every subscription.
    pub verifier: Option<Arc<dyn TokenVerifier>>,
    /// Header carrying the webhook secret.
    pub secret_header: String,
    /// Frame buffer per real-time connection.
    pub connection_buffer: usize,
    pub auth: AuthConfig,
    pub health: HealthState,
}

/// Builds the gateway router.
///
/// - `POST /{webhook_path}/{secret}` (secret in path, optional header)
/// - `GET /ws?token=` (signed token)
/// - `POST /v1/messages`, `POST /v1/conversations`, `POST /v1/outbox`,
///   `GET /v1/outbox/{id}` (bearer)
/// - `GET /health`, `GET /metrics` (public)
pub fn router(state: GatewayState, webhook_path: &str) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .route(
            &format!("/{}/{{secret}}", webhook_path.trim_matches('/')),
            post(webhook::post_webhook),
        )
        .route("/ws", get(ws::ws_handler))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/messages", post(handlers::post_messages))
        .route("/v1/conversations", post(handlers::post_conversations))
        .route("/v1/outbox", post(handlers::post_outbox))
        .route("/v1/outbox/{id}", get(handlers::get_outbox_item))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds `host:port`.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, SwitchboardError> {
    let addr = format!("{host}:{port}");
    TcpListener::bind(&addr)
        .await
        .map_err(|e| SwitchboardError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Serves `app` until `cancel` fires, then drains open requests.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    cancel: CancellationToken,
) -> Result<(), SwitchboardError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("gateway server listening on {addr}");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| SwitchboardError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway server stopped");
    Ok(())
}
