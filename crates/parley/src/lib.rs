//! Parley: a WebRTC signalling relay with room membership.
//!
//! Peers connect over WebSocket, join a named room and exchange opaque
//! handshake payloads with the other members through the relay.

pub mod api;
pub mod config;
pub mod relay;
pub mod ws;
