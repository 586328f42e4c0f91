//! Session input events.
//!
//! Everything the transport reports back, plus time ticks, enters the
//! [`crate::Session`] as a [`SessionEvent`].

use crate::{RoomDescriptor, SubscriptionId};

/// Events processed by the session state machine.
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulated clocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent<I = std::time::Instant> {
    /// Transport accepted the connect request.
    Connected,

    /// Transport rejected the connect request.
    ConnectFailed {
        /// Reason reported by the transport.
        reason: String,
    },

    /// Room listing arrived.
    CatalogLoaded(Vec<RoomDescriptor>),

    /// Room listing could not be fetched.
    CatalogFailed {
        /// Reason reported by the transport.
        reason: String,
    },

    /// Transport rejected a join request.
    JoinFailed {
        /// Room that could not be joined.
        room: String,
        /// Subscription the join was requested under.
        subscription: SubscriptionId,
        /// Reason reported by the transport.
        reason: String,
    },

    /// Event from a room subscription.
    Room(RoomEvent),

    /// Time tick for timeout processing.
    Tick {
        /// Current time from the environment.
        now: I,
    },
}

/// Event delivered on a room subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEvent {
    /// Room the event originated in.
    pub room: String,
    /// Subscription that delivered the event.
    pub subscription: SubscriptionId,
    /// What happened.
    pub kind: RoomEventKind,
}

impl RoomEvent {
    /// Create a room event.
    pub fn new(room: impl Into<String>, subscription: SubscriptionId, kind: RoomEventKind) -> Self {
        Self { room: room.into(), subscription, kind }
    }
}

/// Kinds of room events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEventKind {
    /// The local user's join was acknowledged.
    SelfJoined,

    /// Another user joined.
    UserJoined {
        /// Identity of the user.
        nickname: String,
    },

    /// A user left.
    UserLeft {
        /// Identity of the user.
        nickname: String,
    },

    /// A message was posted.
    Message {
        /// Sender identity.
        sender: String,
        /// Message text.
        text: String,
    },
}
