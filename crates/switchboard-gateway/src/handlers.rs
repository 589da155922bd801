// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use switchboard_core::{HealthStatus, NewOutboxItem, SwitchboardError};
use switchboard_delivery::DeliveryState;

use crate::server::GatewayState;

/// Request body for POST /v1/messages.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub tenant_id: String,
    pub conversation_id: String,
    pub text: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Response body for POST /v1/messages.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    /// `sent`, `queued` or `skipped`.
    pub delivery: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbox_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
}

/// Request body for POST /v1/conversations.
#[derive(Debug, Deserialize)]
pub struct ConversationRequest {
    pub tenant_id: String,
    pub codename: String,
}

/// Request body for POST /v1/outbox.
#[derive(Debug, Deserialize)]
pub struct OutboxRequest {
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Response body carrying a created id.
#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status string.
    pub status: String,
    /// Binary version.
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Maps a domain error onto an HTTP response without leaking internals.
fn failure(e: SwitchboardError) -> Response {
    match e {
        SwitchboardError::NotFound(what) => {
            error_response(StatusCode::NOT_FOUND, format!("not found: {what}"))
        }
        SwitchboardError::Serialization(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        other => {
            tracing::error!(error = %other, "request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// POST /v1/messages
///
/// Records a customer message and delivers it to the operator channel.
pub async fn post_messages(
    State(state): State<GatewayState>,
    Json(body): Json<MessageRequest>,
) -> Response {
    if body.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "text must not be empty");
    }

    match state
        .customers
        .send(
            &body.tenant_id,
            &body.conversation_id,
            &body.text,
            body.idempotency_key,
        )
        .await
    {
        Ok(sent) => {
            let (delivery, outbox_id) = match sent.delivery {
                DeliveryState::Sent => ("sent", None),
                DeliveryState::Queued { outbox_id } => ("queued", Some(outbox_id)),
                DeliveryState::Skipped => ("skipped", None),
            };
            Json(MessageResponse {
                id: sent.message.id,
                delivery,
                outbox_id,
                thread_id: sent.thread_id,
            })
            .into_response()
        }
        Err(e) => failure(e),
    }
}

/// POST /v1/conversations
pub async fn post_conversations(
    State(state): State<GatewayState>,
    Json(body): Json<ConversationRequest>,
) -> Response {
    if body.codename.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "codename must not be empty");
    }
    match state
        .storage
        .create_conversation(&body.tenant_id, &body.codename)
        .await
    {
        Ok(conversation) => (
            StatusCode::CREATED,
            Json(IdResponse {
                id: conversation.id,
            }),
        )
            .into_response(),
        Err(e) => failure(e),
    }
}

/// POST /v1/outbox
///
/// Enqueues an arbitrary outbox item. Repeating an idempotency key returns
/// the existing item's id.
pub async fn post_outbox(
    State(state): State<GatewayState>,
    Json(body): Json<OutboxRequest>,
) -> Response {
    let item = NewOutboxItem {
        tenant_id: body.tenant_id,
        kind: body.kind,
        payload: body.payload,
        idempotency_key: body.idempotency_key,
    };
    match state.storage.enqueue(item).await {
        Ok(item) => Json(IdResponse { id: item.id }).into_response(),
        Err(e) => failure(e),
    }
}

/// GET /v1/outbox/{id}
pub async fn get_outbox_item(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.storage.get_outbox_item(&id).await {
        Ok(Some(item)) => Json(item).into_response(),
        Ok(None) => failure(SwitchboardError::NotFound(format!("outbox item {id}"))),
        Err(e) => failure(e),
    }
}

/// GET /health
///
/// Unauthenticated; reports degraded when the store is unreachable.
pub async fn get_public_health(State(state): State<GatewayState>) -> Response {
    let (status, code) = match state.storage.health_check().await {
        Ok(HealthStatus::Healthy) => ("ok", StatusCode::OK),
        Ok(HealthStatus::Degraded(_)) => ("degraded", StatusCode::OK),
        Ok(HealthStatus::Unhealthy(reason)) => {
            tracing::warn!(reason = %reason, "storage unhealthy");
            ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
        }
        Err(e) => {
            tracing::warn!(error = %e, "storage health check failed");
            ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
        }
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.health.start_time.elapsed().as_secs(),
        }),
    )
        .into_response()
}

/// GET /metrics
///
/// Prometheus text exposition, when an exporter is installed.
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "metrics exporter not enabled"),
    }
}
