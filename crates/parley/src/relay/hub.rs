//! Signal hub: shared relay state for all live connections.

use dashmap::DashMap;
use log::{debug, info, log, warn};
use parley_protocol::{
    AnnounceRequest, ClientEvent, ConnId, IdentityRequest, RoomName, ServerEvent, SignalMessage,
};
use serde_json::Value;
use tokio::sync::{Mutex, mpsc, mpsc::error::TrySendError};

use super::TrustPolicy;
use super::error::RelayError;
use super::registry::{Departure, RoomRegistry};

/// Default size of the per-connection outbound queue.
pub const DEFAULT_CONNECTION_BUFFER: usize = 256;

/// Outbound queue of one connection.
pub type RelaySender = mpsc::Sender<ServerEvent>;
pub type RelayReceiver = mpsc::Receiver<ServerEvent>;

/// Hub owning room membership and the outbound queue of every connection.
///
/// Every operation takes the registry lock once and enqueues its
/// notifications before releasing it, so peers observe membership changes
/// in the order they were applied. Enqueueing never blocks: a full or
/// closed queue drops the event.
pub struct SignalHub {
    /// Room membership, guarded as a whole
    registry: Mutex<RoomRegistry>,

    /// Connection ID -> outbound queue
    connections: DashMap<ConnId, RelaySender>,

    policy: TrustPolicy,

    buffer: usize,
}

impl SignalHub {
    pub fn new(policy: TrustPolicy, buffer: usize) -> Self {
        Self {
            registry: Mutex::new(RoomRegistry::new()),
            connections: DashMap::new(),
            policy,
            buffer: buffer.max(1),
        }
    }

    pub fn policy(&self) -> TrustPolicy {
        self.policy
    }

    /// Register a new connection.
    ///
    /// Returns the assigned connection ID and the receiver for events
    /// addressed to it. The first queued event is `connected`.
    pub async fn register_connection(&self) -> (ConnId, RelayReceiver) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let mut registry = self.registry.lock().await;

        let conn_id = loop {
            let candidate = nanoid::nanoid!();
            if registry.connect(&candidate) {
                break candidate;
            }
        };
        self.connections.insert(conn_id.clone(), tx);
        self.deliver(
            &conn_id,
            ServerEvent::Connected {
                socket_id: conn_id.clone(),
            },
        );

        info!(
            "Registered connection {} ({} live)",
            conn_id,
            registry.connection_count()
        );
        (conn_id, rx)
    }

    /// Join a room and return the members that were already in it.
    pub async fn join_room(&self, conn: &str, raw_room: &Value) -> Result<Vec<ConnId>, RelayError> {
        let room =
            RoomName::from_value(raw_room).ok_or(RelayError::InvalidInput("room name is empty"))?;

        let mut registry = self.registry.lock().await;
        let outcome = registry.join(conn, room)?;

        if let Some(left) = &outcome.left {
            self.announce_departure(conn, left);
        }
        self.deliver(conn, ServerEvent::Introduction(outcome.introduction.clone()));
        self.broadcast(
            &outcome.members,
            ServerEvent::NewUserConnected(conn.to_string()),
        );

        info!(
            "Connection {} joined room {} ({} members)",
            conn,
            outcome.room,
            outcome.members.len()
        );
        Ok(outcome.introduction)
    }

    /// Leave a room. `Ok(false)` when the connection was not in it.
    pub async fn leave_room(&self, conn: &str, raw_room: &Value) -> Result<bool, RelayError> {
        let room =
            RoomName::from_value(raw_room).ok_or(RelayError::InvalidInput("room name is empty"))?;

        let mut registry = self.registry.lock().await;
        if !registry.is_connected(conn) {
            return Err(RelayError::UnknownConnection(conn.to_string()));
        }

        match registry.leave(conn, &room) {
            Some(departure) => {
                self.announce_departure(conn, &departure);
                Ok(true)
            }
            None => {
                debug!("Connection {} is not in room {}, nothing to leave", conn, room);
                Ok(false)
            }
        }
    }

    /// Tear down a connection: leave its recorded room and drop its queue.
    pub async fn disconnect(&self, conn: &str) {
        let mut registry = self.registry.lock().await;
        if let Some(departure) = registry.disconnect(conn) {
            self.announce_departure(conn, &departure);
        }
        self.connections.remove(conn);

        info!(
            "Unregistered connection {} ({} live)",
            conn,
            registry.connection_count()
        );
    }

    /// Forward a handshake message to one member of the sender's room.
    pub async fn relay_signal(&self, conn: &str, message: SignalMessage) -> Result<(), RelayError> {
        if message.to.is_empty() {
            return Err(RelayError::InvalidInput("signal target is empty"));
        }
        if self.policy.verify_sender && message.from != conn {
            return Err(RelayError::TrustViolation(format!(
                "signal from {} claims to be from {}",
                conn, message.from
            )));
        }

        let registry = self.registry.lock().await;
        let room = registry
            .room_of(conn)
            .ok_or_else(|| RelayError::NotJoined(conn.to_string()))?;
        if !registry.is_member(room.as_str(), &message.to) {
            return Err(RelayError::AddressingFailure {
                target: message.to,
                room: room.clone(),
            });
        }

        let target = message.to.clone();
        debug!("Relaying signal {} -> {} in room {}", conn, target, room);
        self.deliver(&target, ServerEvent::Signal(message));
        Ok(())
    }

    /// Broadcast an identity to a room. Returns the number of recipients.
    pub async fn announce(&self, conn: &str, request: AnnounceRequest) -> Result<usize, RelayError> {
        let registry = self.registry.lock().await;
        let room = self.resolve_room(&registry, conn, request.room.as_ref())?;

        let members = registry.members(room.as_str());
        self.broadcast(
            &members,
            ServerEvent::Announce {
                socket_id: conn.to_string(),
                name: request.name,
            },
        );
        Ok(members.len())
    }

    /// Ask one peer to announce itself.
    pub async fn request_identity(
        &self,
        conn: &str,
        request: IdentityRequest,
    ) -> Result<(), RelayError> {
        let registry = self.registry.lock().await;
        let room = self.resolve_room(&registry, conn, request.room.as_ref())?;
        let target = request
            .socket_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(RelayError::InvalidInput("identity target is empty"))?;

        if self.policy.enforce_membership && !registry.is_member(room.as_str(), &target) {
            return Err(RelayError::AddressingFailure { target, room });
        }

        self.deliver(&target, ServerEvent::AskToAnnounce);
        Ok(())
    }

    /// Route one inbound event. Failures are logged and the event dropped.
    pub async fn dispatch(&self, conn: &str, event: ClientEvent) {
        let name = event.name();
        let result = match event {
            ClientEvent::JoinRoom(room) => self.join_room(conn, &room).await.map(|_| ()),
            ClientEvent::LeaveRoom(room) => self.leave_room(conn, &room).await.map(|_| ()),
            ClientEvent::Signal(message) => self.relay_signal(conn, message).await,
            ClientEvent::Announce(request) => self.announce(conn, request).await.map(|_| ()),
            ClientEvent::RequestIdentityFor(request) => self.request_identity(conn, request).await,
            ClientEvent::Pong => Ok(()),
        };

        if let Err(err) = result {
            log!(err.level(), "Dropped {} from {}: {}", name, conn, err);
        }
    }

    /// Explicit room if given, otherwise the connection's current room.
    fn resolve_room(
        &self,
        registry: &RoomRegistry,
        conn: &str,
        explicit: Option<&Value>,
    ) -> Result<RoomName, RelayError> {
        let recorded = registry.room_of(conn);
        match (explicit.and_then(RoomName::from_value), recorded) {
            (Some(room), recorded) => {
                if self.policy.enforce_membership && recorded != Some(&room) {
                    return Err(RelayError::TrustViolation(format!(
                        "{} is not a member of room {}",
                        conn, room
                    )));
                }
                Ok(room)
            }
            (None, Some(room)) => Ok(room.clone()),
            (None, None) => Err(RelayError::NotJoined(conn.to_string())),
        }
    }

    fn announce_departure(&self, conn: &str, departure: &Departure) {
        self.broadcast(
            &departure.remaining,
            ServerEvent::UserDisconnected(conn.to_string()),
        );
        info!(
            "Connection {} left room {} ({} remaining)",
            conn,
            departure.room,
            departure.remaining.len()
        );
    }

    fn broadcast(&self, members: &[ConnId], event: ServerEvent) {
        for member in members {
            self.deliver(member, event.clone());
        }
    }

    /// Enqueue an event for one connection without waiting.
    fn deliver(&self, conn: &str, event: ServerEvent) -> bool {
        let Some(tx) = self.connections.get(conn) else {
            debug!("No live connection {}, dropping {} event", conn, event.name());
            return false;
        };

        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Outbound queue full for connection {}, dropping {} event",
                    conn,
                    event.name()
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                debug!(
                    "Connection {} is closing, dropping {} event",
                    conn,
                    event.name()
                );
                false
            }
        }
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.registry.lock().await.connection_count()
    }

    /// Number of non-empty rooms.
    pub async fn room_count(&self) -> usize {
        self.registry.lock().await.room_count()
    }

    /// Member count of a room, `None` if it does not exist.
    pub async fn room_size(&self, room: &str) -> Option<usize> {
        self.registry.lock().await.room_size(room)
    }

    /// The room a connection is currently in.
    pub async fn room_of(&self, conn: &str) -> Option<RoomName> {
        self.registry.lock().await.room_of(conn).cloned()
    }
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new(TrustPolicy::default(), DEFAULT_CONNECTION_BUFFER)
    }
}
