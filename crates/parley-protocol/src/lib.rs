//! Wire protocol for the parley signalling relay.
//!
//! Every WebSocket text frame carries one JSON envelope of the form
//! `{"event": "<name>", "data": <payload>}`. Clients send [`ClientEvent`]s,
//! the relay answers with [`ServerEvent`]s. Signalling payloads are opaque
//! JSON values and are forwarded without interpretation.

pub mod events;
pub mod room;

pub use events::{AnnounceRequest, ClientEvent, IdentityRequest, ServerEvent, SignalMessage};
pub use room::RoomName;

/// Identifier of one live connection, assigned by the relay at connect time.
pub type ConnId = String;
