//! Room registry and signalling relay.
//!
//! [`RoomRegistry`] is the membership model; [`SignalHub`] serializes every
//! lifecycle and relay operation over it and delivers the resulting events
//! to per-connection outbound queues.

mod error;
mod hub;
mod registry;

pub use error::RelayError;
pub use hub::{DEFAULT_CONNECTION_BUFFER, RelayReceiver, RelaySender, SignalHub};
pub use registry::{Departure, JoinOutcome, RoomRegistry};

/// How far the relay trusts what peers claim about themselves.
///
/// The default trusts everything: `signal.from` is forwarded verbatim and
/// an explicit room in `announce`/`requestIdentityFor` is used as given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrustPolicy {
    /// Drop signals whose `from` differs from the sender's connection id.
    pub verify_sender: bool,
    /// Require explicit rooms to be the sender's room, and identity
    /// request targets to be members of it.
    pub enforce_membership: bool,
}
