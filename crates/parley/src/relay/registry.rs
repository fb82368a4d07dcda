//! Room membership table.
//!
//! Pure data structure: it records which room each connection is in and
//! which connections each room holds, and reports what changed so the hub
//! can notify peers. It performs no I/O and no locking of its own.

use std::collections::{HashMap, HashSet};

use log::debug;
use parley_protocol::{ConnId, RoomName};

use super::error::RelayError;

#[derive(Debug, Default)]
struct ConnectionState {
    room: Option<RoomName>,
}

/// A connection was removed from a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room: RoomName,
    /// Members left in the room after the removal.
    pub remaining: Vec<ConnId>,
}

/// What a join changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub room: RoomName,
    /// Set when the connection had to leave a different room first.
    pub left: Option<Departure>,
    /// Members of the room other than the joiner.
    pub introduction: Vec<ConnId>,
    /// All members of the room, joiner included.
    pub members: Vec<ConnId>,
}

/// Room name -> member set, plus connection -> current room.
///
/// A room entry exists exactly as long as its member set is non-empty, and
/// a connection id is in a room's set iff that connection's recorded room
/// is that room.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomName, HashSet<ConnId>>,
    connections: HashMap<ConnId, ConnectionState>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection with no room. Returns false if it already exists.
    pub fn connect(&mut self, conn: &str) -> bool {
        if self.connections.contains_key(conn) {
            return false;
        }
        self.connections
            .insert(conn.to_string(), ConnectionState::default());
        true
    }

    pub fn is_connected(&self, conn: &str) -> bool {
        self.connections.contains_key(conn)
    }

    /// Put `conn` into `room`, leaving its previous room first if different.
    pub fn join(&mut self, conn: &str, room: RoomName) -> Result<JoinOutcome, RelayError> {
        let prior = self
            .connections
            .get(conn)
            .ok_or_else(|| RelayError::UnknownConnection(conn.to_string()))?
            .room
            .clone();

        let left = match prior {
            Some(prior) if prior != room => self.remove_member(conn, &prior),
            _ => None,
        };

        let members = self.rooms.entry(room.clone()).or_insert_with(|| {
            debug!("Room {} opened", room);
            HashSet::new()
        });
        members.insert(conn.to_string());

        let introduction = members
            .iter()
            .filter(|member| member.as_str() != conn)
            .cloned()
            .collect();
        let members = members.iter().cloned().collect();

        if let Some(state) = self.connections.get_mut(conn) {
            state.room = Some(room.clone());
        }

        Ok(JoinOutcome {
            room,
            left,
            introduction,
            members,
        })
    }

    /// Remove `conn` from `room`. `None` when it was not a member.
    pub fn leave(&mut self, conn: &str, room: &RoomName) -> Option<Departure> {
        self.remove_member(conn, room)
    }

    /// Forget `conn` entirely, leaving its recorded room if any.
    pub fn disconnect(&mut self, conn: &str) -> Option<Departure> {
        let state = self.connections.remove(conn)?;
        let room = state.room?;
        self.remove_member(conn, &room)
    }

    fn remove_member(&mut self, conn: &str, room: &RoomName) -> Option<Departure> {
        let members = self.rooms.get_mut(room.as_str())?;
        if !members.remove(conn) {
            return None;
        }

        let remaining: Vec<ConnId> = members.iter().cloned().collect();
        if remaining.is_empty() {
            self.rooms.remove(room.as_str());
            debug!("Room {} closed", room);
        }

        if let Some(state) = self.connections.get_mut(conn)
            && state.room.as_ref() == Some(room)
        {
            state.room = None;
        }

        Some(Departure {
            room: room.clone(),
            remaining,
        })
    }

    /// The room `conn` is currently in.
    pub fn room_of(&self, conn: &str) -> Option<&RoomName> {
        self.connections.get(conn)?.room.as_ref()
    }

    pub fn is_member(&self, room: &str, conn: &str) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|members| members.contains(conn))
    }

    pub fn members(&self, room: &str) -> Vec<ConnId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Member count, `None` when the room does not exist.
    pub fn room_size(&self, room: &str) -> Option<usize> {
        self.rooms.get(room).map(HashSet::len)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
