//! Relay error taxonomy.
//!
//! None of these are surfaced to peers: the dispatcher logs them and drops
//! the offending message.

use log::Level;
use parley_protocol::{ConnId, RoomName};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("connection {0} has not joined a room")]
    NotJoined(ConnId),

    #[error("target {target} is not a member of room {room}")]
    AddressingFailure { target: ConnId, room: RoomName },

    #[error("rejected by trust policy: {0}")]
    TrustViolation(String),

    #[error("connection {0} is not registered")]
    UnknownConnection(ConnId),
}

impl RelayError {
    /// Log level for a dropped message.
    pub fn level(&self) -> Level {
        match self {
            RelayError::InvalidInput(_) | RelayError::NotJoined(_) => Level::Debug,
            RelayError::AddressingFailure { .. }
            | RelayError::TrustViolation(_)
            | RelayError::UnknownConnection(_) => Level::Warn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(RelayError::InvalidInput("room").level(), Level::Debug);
        assert_eq!(RelayError::NotJoined("a".into()).level(), Level::Debug);
        assert_eq!(
            RelayError::AddressingFailure {
                target: "b".into(),
                room: RoomName::parse("r").unwrap(),
            }
            .level(),
            Level::Warn
        );
    }

    #[test]
    fn test_messages() {
        let err = RelayError::AddressingFailure {
            target: "b".into(),
            room: RoomName::parse("meet1").unwrap(),
        };
        assert_eq!(err.to_string(), "target b is not a member of room meet1");
    }
}
