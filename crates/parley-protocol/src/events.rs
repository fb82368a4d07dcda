//! Event envelopes exchanged over the signalling socket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ConnId;

// ============================================================================
// Commands (Client -> Server)
// ============================================================================

/// Events sent by a peer to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Join a room. The payload is coerced to a room name.
    JoinRoom(Value),

    /// Leave a room.
    LeaveRoom(Value),

    /// Relay a handshake message to one peer of the sender's room.
    Signal(SignalMessage),

    /// Broadcast an identity to a room.
    Announce(AnnounceRequest),

    /// Ask one peer to announce itself.
    RequestIdentityFor(IdentityRequest),

    /// Keepalive reply. Accepted and ignored; liveness is not tracked.
    Pong,
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinRoom(_) => "joinRoom",
            ClientEvent::LeaveRoom(_) => "leaveRoom",
            ClientEvent::Signal(_) => "signal",
            ClientEvent::Announce(_) => "announce",
            ClientEvent::RequestIdentityFor(_) => "requestIdentityFor",
            ClientEvent::Pong => "pong",
        }
    }
}

/// A directed handshake message.
///
/// `from` is a label chosen by the sender and `data` is opaque; both are
/// forwarded exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub data: Value,
}

/// Identity announcement. Without a room the sender's current room is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnounceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Prompt a specific peer to announce itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<ConnId>,
}

// ============================================================================
// Events (Server -> Client)
// ============================================================================

/// Events delivered by the relay to a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Sent once after the socket is accepted.
    #[serde(rename_all = "camelCase")]
    Connected { socket_id: ConnId },

    /// Members already present in the room, sent to the joiner only.
    Introduction(Vec<ConnId>),

    /// A peer joined the room.
    NewUserConnected(ConnId),

    /// A peer left the room or disconnected.
    UserDisconnected(ConnId),

    /// A relayed handshake message.
    Signal(SignalMessage),

    /// Identity announcement of a room member.
    #[serde(rename_all = "camelCase")]
    Announce {
        socket_id: ConnId,
        name: Option<String>,
    },

    /// Please announce your identity.
    AskToAnnounce,

    /// Keepalive ping. Keeps idle sockets open through proxies; no reply is
    /// required and silent clients are not disconnected.
    Ping,
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::Introduction(_) => "introduction",
            ServerEvent::NewUserConnected(_) => "newUserConnected",
            ServerEvent::UserDisconnected(_) => "userDisconnected",
            ServerEvent::Signal(_) => "signal",
            ServerEvent::Announce { .. } => "announce",
            ServerEvent::AskToAnnounce => "askToAnnounce",
            ServerEvent::Ping => "ping",
        }
    }
}
