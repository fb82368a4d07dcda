//! WebSocket transport for the signal relay.

mod handler;

pub use handler::{handle_ws_connection, ws_handler};
