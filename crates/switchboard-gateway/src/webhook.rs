// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP binding of the webhook ingestor.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use switchboard_delivery::IngestOutcome;

use crate::server::GatewayState;

/// Provider-neutral secret header, accepted alongside the configured one.
pub const GENERIC_SECRET_HEADER: &str = "x-provider-secret-token";

/// Status code returned for an ingest outcome.
pub fn status_for(outcome: IngestOutcome) -> StatusCode {
    match outcome {
        IngestOutcome::NotFound => StatusCode::NOT_FOUND,
        IngestOutcome::Unauthorized => StatusCode::UNAUTHORIZED,
        IngestOutcome::Accepted | IngestOutcome::Duplicate | IngestOutcome::Ignored => {
            StatusCode::OK
        }
    }
}

/// POST /{webhook_path}/{secret}
pub async fn post_webhook(
    State(state): State<GatewayState>,
    Path(secret): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_secret = headers
        .get(state.secret_header.as_str())
        .or_else(|| headers.get(GENERIC_SECRET_HEADER))
        .and_then(|v| v.to_str().ok());

    let outcome = state.ingestor.ingest(&secret, header_secret, &body).await;
    let status = status_for(outcome);
    (
        status,
        Json(serde_json::json!({ "ok": status.is_success() })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_map_to_statuses() {
        assert_eq!(status_for(IngestOutcome::Accepted), StatusCode::OK);
        assert_eq!(status_for(IngestOutcome::Duplicate), StatusCode::OK);
        assert_eq!(status_for(IngestOutcome::Ignored), StatusCode::OK);
        assert_eq!(status_for(IngestOutcome::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(IngestOutcome::Unauthorized), StatusCode::UNAUTHORIZED);
    }
}
