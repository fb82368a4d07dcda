//! End-to-end tests over real WebSocket connections.

use std::time::Duration;

use parley_protocol::{AnnounceRequest, ClientEvent, IdentityRequest, ServerEvent, SignalMessage};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, client::IntoClientRequest, http::StatusCode};

mod common;
use common::{
    connect, expect_silence, recv_event, send_event, send_raw, spawn_server, test_config,
    test_state,
};
use parley::api::AppState;

const QUIET: Duration = Duration::from_millis(200);

#[tokio::test]
async fn test_meeting_over_websocket() {
    let state = test_state();
    let addr = spawn_server(state.clone()).await;

    let (mut a, a_id) = connect(addr).await;
    let (mut b, b_id) = connect(addr).await;
    assert_ne!(a_id, b_id);

    send_event(&mut a, &ClientEvent::JoinRoom(json!("meet1"))).await;
    assert_eq!(recv_event(&mut a).await, ServerEvent::Introduction(vec![]));
    assert_eq!(
        recv_event(&mut a).await,
        ServerEvent::NewUserConnected(a_id.clone())
    );

    send_event(&mut b, &ClientEvent::JoinRoom(json!("meet1"))).await;
    assert_eq!(
        recv_event(&mut b).await,
        ServerEvent::Introduction(vec![a_id.clone()])
    );
    assert_eq!(
        recv_event(&mut b).await,
        ServerEvent::NewUserConnected(b_id.clone())
    );
    assert_eq!(
        recv_event(&mut a).await,
        ServerEvent::NewUserConnected(b_id.clone())
    );

    let offer = SignalMessage {
        to: b_id.clone(),
        from: a_id.clone(),
        data: json!({"type": "offer", "sdp": "v=0"}),
    };
    send_event(&mut a, &ClientEvent::Signal(offer.clone())).await;
    assert_eq!(recv_event(&mut b).await, ServerEvent::Signal(offer));

    b.close(None).await.unwrap();
    assert_eq!(
        recv_event(&mut a).await,
        ServerEvent::UserDisconnected(b_id.clone())
    );
    assert_eq!(state.hub.room_size("meet1").await, Some(1));

    a.close(None).await.unwrap();
    for _ in 0..50 {
        if state.hub.connection_count().await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(state.hub.connection_count().await, 0);
    assert_eq!(state.hub.room_size("meet1").await, None);
}

#[tokio::test]
async fn test_malformed_frames_are_ignored() {
    let addr = spawn_server(test_state()).await;
    let (mut a, _) = connect(addr).await;

    send_raw(&mut a, "not json").await;
    send_raw(&mut a, r#"{"event": "teleport", "data": 1}"#).await;
    send_raw(&mut a, r#"{"event": "joinRoom", "data": ""}"#).await;
    expect_silence(&mut a, QUIET).await;

    send_event(&mut a, &ClientEvent::JoinRoom(json!(42))).await;
    assert_eq!(recv_event(&mut a).await, ServerEvent::Introduction(vec![]));
}

#[tokio::test]
async fn test_pings_need_no_reply() {
    let mut config = test_config();
    config.ws.ping_interval_secs = 1;
    let state = AppState::new(config);
    let addr = spawn_server(state.clone()).await;
    let (mut a, _) = connect(addr).await;

    send_event(&mut a, &ClientEvent::Pong).await;
    expect_silence(&mut a, Duration::from_millis(2500)).await;
    assert_eq!(state.hub.connection_count().await, 1);

    send_event(&mut a, &ClientEvent::JoinRoom(json!("meet1"))).await;
    assert_eq!(recv_event(&mut a).await, ServerEvent::Introduction(vec![]));
}

#[tokio::test]
async fn test_announce_and_identity_request() {
    let addr = spawn_server(test_state()).await;
    let (mut a, a_id) = connect(addr).await;
    let (mut b, _) = connect(addr).await;

    send_event(&mut a, &ClientEvent::JoinRoom(json!("standup"))).await;
    recv_event(&mut a).await;
    recv_event(&mut a).await;
    send_event(&mut b, &ClientEvent::JoinRoom(json!("standup"))).await;
    recv_event(&mut b).await;
    recv_event(&mut b).await;
    recv_event(&mut a).await;

    send_event(
        &mut b,
        &ClientEvent::RequestIdentityFor(IdentityRequest {
            room: None,
            socket_id: Some(a_id.clone()),
        }),
    )
    .await;
    assert_eq!(recv_event(&mut a).await, ServerEvent::AskToAnnounce);

    send_event(
        &mut a,
        &ClientEvent::Announce(AnnounceRequest {
            room: None,
            name: Some("Ada".to_string()),
        }),
    )
    .await;
    let expected = ServerEvent::Announce {
        socket_id: a_id.clone(),
        name: Some("Ada".to_string()),
    };
    assert_eq!(recv_event(&mut a).await, expected);
    assert_eq!(recv_event(&mut b).await, expected);
    expect_silence(&mut b, QUIET).await;
}

#[tokio::test]
async fn test_leave_room_notifies_remaining_members() {
    let state = test_state();
    let addr = spawn_server(state.clone()).await;
    let (mut a, _) = connect(addr).await;
    let (mut b, b_id) = connect(addr).await;

    send_event(&mut a, &ClientEvent::JoinRoom(json!("meet1"))).await;
    recv_event(&mut a).await;
    recv_event(&mut a).await;
    send_event(&mut b, &ClientEvent::JoinRoom(json!("meet1"))).await;
    recv_event(&mut b).await;
    recv_event(&mut b).await;
    recv_event(&mut a).await;

    send_event(&mut b, &ClientEvent::LeaveRoom(json!("meet1"))).await;
    assert_eq!(recv_event(&mut a).await, ServerEvent::UserDisconnected(b_id));
    expect_silence(&mut b, QUIET).await;
    assert_eq!(state.hub.room_size("meet1").await, Some(1));
    assert_eq!(state.hub.connection_count().await, 2);
}

#[tokio::test]
async fn test_signal_outside_room_is_dropped() {
    let addr = spawn_server(test_state()).await;
    let (mut a, a_id) = connect(addr).await;
    let (mut b, b_id) = connect(addr).await;

    send_event(&mut b, &ClientEvent::JoinRoom(json!("meet1"))).await;
    recv_event(&mut b).await;
    recv_event(&mut b).await;

    send_event(
        &mut a,
        &ClientEvent::Signal(SignalMessage {
            to: b_id,
            from: a_id,
            data: json!({"type": "offer"}),
        }),
    )
    .await;
    expect_silence(&mut b, QUIET).await;
}

#[tokio::test]
async fn test_disallowed_origin_is_rejected() {
    let mut config = test_config();
    config.cors.allowed_origins = vec!["https://meet.example.com".to_string()];
    let addr = spawn_server(AppState::new(config)).await;

    let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("origin", "https://evil.example.com".parse().unwrap());
    match connect_async(request).await {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }
        Err(e) => panic!("expected 403, got {e}"),
        Ok(_) => panic!("expected 403, upgrade succeeded"),
    }

    // Origins match exactly, as in the HTTP CORS layer.
    let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("origin", "HTTPS://MEET.EXAMPLE.COM".parse().unwrap());
    match connect_async(request).await {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }
        Err(e) => panic!("expected 403, got {e}"),
        Ok(_) => panic!("expected 403, upgrade succeeded"),
    }

    let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("origin", "https://meet.example.com".parse().unwrap());
    let (mut client, _) = connect_async(request).await.unwrap();
    assert!(matches!(
        recv_event(&mut client).await,
        ServerEvent::Connected { .. }
    ));
}
