// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket endpoint for real-time conversation updates.
//!
//! A viewer connects to `/ws?token=..`. The token names one conversation;
//! once verified the socket is registered with the local hub, acknowledged
//! with `{"ok":true}`, and then receives one `{direction, text}` frame per
//! message published for that conversation. Client frames are ignored.

use axum::{
    Json,
    extract::ws::rejection::WebSocketUpgradeRejection,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use switchboard_core::RealtimeClaims;
use switchboard_fanout::Connection;
use tracing::{debug, info};

use crate::server::GatewayState;

/// First frame sent after a successful subscription.
pub const ACK_FRAME: &str = r#"{"ok":true}"#;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// GET /ws -- verifies the token before upgrading.
pub async fn ws_handler(
    State(state): State<GatewayState>,
    Query(query): Query<WsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let now = chrono::Utc::now().timestamp();
    let claims = match (&state.verifier, query.token.as_deref()) {
        (Some(verifier), Some(token)) => verifier.verify(token, now),
        _ => None,
    };
    let Some(claims) = claims else {
        debug!("realtime subscription rejected");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "ok": false })),
        )
            .into_response();
    };

    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state, claims)),
        Err(rejection) => rejection.into_response(),
    }
}

async fn handle_socket(socket: WebSocket, state: GatewayState, claims: RealtimeClaims) {
    let (mut sender, mut receiver) = socket.split();
    let (connection, mut frames) = Connection::new(state.connection_buffer);
    let connection_id = connection.id.clone();
    let conversation_id = claims.conversation_id;

    state.hub.register(&conversation_id, connection);
    info!(
        tenant_id = %claims.tenant_id,
        conversation_id = %conversation_id,
        connection_id = %connection_id,
        "realtime viewer connected"
    );

    if sender.send(Message::Text(ACK_FRAME.into())).await.is_err() {
        state.hub.unregister(&conversation_id, &connection_id);
        return;
    }

    let send_task = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    state.hub.unregister(&conversation_id, &connection_id);
    send_task.abort();
    info!(
        conversation_id = %conversation_id,
        connection_id = %connection_id,
        "realtime viewer disconnected"
    );
}
