//! One attached socket: register, relay pushes, disconnect on close.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use roster_core::{ConnectionId, ConnectionRecord};
use roster_gateway::{ClientConnection, LocalGateway};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::metrics::WS_CONNECTIONS_ACTIVE;
use crate::server::AppState;

/// Query string of the upgrade request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsParams {
    /// Display name announced when this socket departs.
    pub user_name: String,
}

/// `GET /ws?userName=<name>`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Response {
    let Some(local) = state.local.clone() else {
        return (StatusCode::NOT_FOUND, "in-process gateway is not enabled").into_response();
    };
    if params.user_name.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "userName must not be empty").into_response();
    }
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| run_session(socket, params.user_name, local, state))
}

fn welcome(connection_id: &ConnectionId) -> Arc<String> {
    Arc::new(
        serde_json::json!({ "action": "connected", "connectionId": connection_id }).to_string(),
    )
}

async fn run_session(socket: WebSocket, user_name: String, local: Arc<LocalGateway>, state: AppState) {
    let connection_id = ConnectionId::generate();
    let record = ConnectionRecord::new(connection_id.clone(), user_name);
    if let Err(err) = state.registry.insert(record).await {
        warn!(connection_id = %connection_id, error = %err, "failed to register connection");
        return;
    }

    let (tx, mut rx) = mpsc::channel::<Arc<String>>(state.config.channel_capacity.max(1));
    let _ = tx.try_send(welcome(&connection_id));
    local.attach(Arc::new(ClientConnection::new(connection_id.clone(), tx)));
    metrics::gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    info!(connection_id = %connection_id, "socket connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let shutdown = state.shutdown.token();

    let writer = async {
        while let Some(text) = rx.recv().await {
            if ws_tx.send(Message::Text(String::clone(&text).into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    };

    let reader = async {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Close(_) => break,
                Message::Text(text) => debug!(connection_id = %connection_id, len = text.as_str().len(), "ignoring client message"),
                _ => {}
            }
        }
    };

    tokio::select! {
        () = writer => {},
        () = reader => {},
        () = shutdown.cancelled() => {},
    }

    if let Some(connection) = local.detach(&connection_id) {
        debug!(
            connection_id = %connection_id,
            age_ms = u64::try_from(connection.age().as_millis()).unwrap_or(u64::MAX),
            dropped = connection.drop_count(),
            "socket session ended"
        );
    }
    metrics::gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    match state.handler.disconnect(&connection_id).await {
        Ok(report) => debug!(connection_id = %connection_id, delivered = report.delivered, "socket closed"),
        Err(err) => warn!(connection_id = %connection_id, error = %err, "disconnect after socket close failed"),
    }
}
