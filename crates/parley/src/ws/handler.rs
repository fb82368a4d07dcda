//! WebSocket handler for signalling clients.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::{HeaderMap, header},
    response::Response,
};
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use parley_protocol::{ClientEvent, ServerEvent};
use std::sync::Arc;
use std::time::Duration;

use crate::api::{ApiError, AppState};
use crate::relay::SignalHub;

/// WebSocket upgrade handler.
///
/// GET /ws
pub async fn ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    // Non-browser clients send no Origin and are always let through.
    if let Some(origin) = headers.get(header::ORIGIN) {
        let origin = origin.to_str().unwrap_or_default();
        if !state.config.cors.is_allowed(origin) {
            warn!("Rejected WebSocket upgrade from origin {:?}", origin);
            return Err(ApiError::forbidden(format!("origin {origin} is not allowed")));
        }
    }

    let hub = state.hub.clone();
    let ping_interval = Duration::from_secs(state.config.ws.ping_interval_secs);
    let max_message_bytes = state.config.ws.max_message_bytes;

    Ok(ws
        .max_message_size(max_message_bytes)
        .on_upgrade(move |socket| handle_ws_connection(socket, hub, ping_interval)))
}

/// Drive one connection until the client goes away.
pub async fn handle_ws_connection(socket: WebSocket, hub: Arc<SignalHub>, ping_interval: Duration) {
    let (mut sender, mut receiver) = socket.split();

    // `connected` is already queued for the client.
    let (conn_id, mut event_rx) = hub.register_connection().await;

    // `ping` only keeps the socket busy. Dead peers surface as send or
    // receive errors, not as missing `pong` replies.
    let send_conn = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_interval);
        // The first tick completes immediately.
        ping.tick().await;

        loop {
            let event = tokio::select! {
                event = event_rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                _ = ping.tick() => ServerEvent::Ping,
            };

            let json = match serde_json::to_string(&event) {
                Ok(j) => j,
                Err(e) => {
                    warn!("Failed to serialize {} event: {}", event.name(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!("Send to connection {} failed, stopping writer", send_conn);
                break;
            }
        }
    });

    loop {
        let msg_result = tokio::select! {
            msg = receiver.next() => msg,
            _ = &mut send_task => {
                debug!("Writer for connection {} finished", conn_id);
                break;
            }
        };

        match msg_result {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => hub.dispatch(&conn_id, event).await,
                Err(e) => {
                    debug!("Ignoring malformed frame from connection {}: {}", conn_id, e);
                }
            },
            Some(Ok(Message::Binary(_))) => {
                debug!("Received binary message from connection {}, ignoring", conn_id);
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) => {
                info!("Connection {} closed WebSocket", conn_id);
                break;
            }
            Some(Err(e)) => {
                warn!("WebSocket error for connection {}: {}", conn_id, e);
                break;
            }
            None => break,
        }
    }

    send_task.abort();
    hub.disconnect(&conn_id).await;
}
