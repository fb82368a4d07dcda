//! Test utilities and common setup.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use futures::{SinkExt, StreamExt};
use parley::api::{self, AppState};
use parley::config::AppConfig;
use parley_protocol::{ClientEvent, ServerEvent};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Config suitable for tests: loopback, short queues.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.relay.connection_buffer = 64;
    config
}

pub fn test_state() -> AppState {
    AppState::new(test_config())
}

/// Create a test application with default settings.
pub fn test_app() -> Router {
    api::create_router(test_state())
}

/// Serve `state` on an ephemeral loopback port.
pub async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = api::create_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Open a socket and consume the `connected` greeting.
pub async fn connect(addr: SocketAddr) -> (Client, String) {
    let (mut client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    match recv_event(&mut client).await {
        ServerEvent::Connected { socket_id } => (client, socket_id),
        other => panic!("expected connected, got {other:?}"),
    }
}

pub async fn send_event(client: &mut Client, event: &ClientEvent) {
    let json = serde_json::to_string(event).unwrap();
    client.send(Message::text(json)).await.unwrap();
}

pub async fn send_raw(client: &mut Client, text: &str) {
    client.send(Message::text(text.to_string())).await.unwrap();
}

/// Next relay event, skipping keepalive pings.
pub async fn recv_event(client: &mut Client) -> ServerEvent {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for event")
            .expect("socket closed")
            .expect("socket error");
        if !msg.is_text() {
            continue;
        }
        let event: ServerEvent = serde_json::from_str(msg.to_text().unwrap()).unwrap();
        if event != ServerEvent::Ping {
            return event;
        }
    }
}

/// Assert nothing but pings arrives within `wait`.
pub async fn expect_silence(client: &mut Client, wait: Duration) {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        match tokio::time::timeout_at(deadline, client.next()).await {
            Err(_) => return,
            Ok(Some(Ok(msg))) if msg.is_text() => {
                let event: ServerEvent = serde_json::from_str(msg.to_text().unwrap()).unwrap();
                assert_eq!(event, ServerEvent::Ping, "unexpected event {event:?}");
            }
            Ok(Some(Ok(_))) => {}
            Ok(other) => panic!("socket ended early: {other:?}"),
        }
    }
}
