//! Transport abstraction.
//!
//! The [`Transport`] trait decouples the runtime from the wire. Production
//! frontends implement it over a real connection; the simulation harness
//! implements it over an in-process server so the same [`crate::Runtime`]
//! runs in both.

use std::future::Future;

use talkroom_core::{RoomDescriptor, RoomEvent, SessionEvent, SubscriptionId, TransportCommand};

/// Responses and room events reported by the transport.
///
/// Mirrors [`SessionEvent`] minus time ticks, which the runtime produces
/// itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connect request accepted.
    Connected,
    /// Connect request rejected.
    ConnectFailed {
        /// Reason for the rejection.
        reason: String,
    },
    /// Room listing arrived.
    CatalogLoaded(Vec<RoomDescriptor>),
    /// Room listing could not be fetched.
    CatalogFailed {
        /// Reason for the failure.
        reason: String,
    },
    /// Join request rejected.
    JoinFailed {
        /// Room that could not be joined.
        room: String,
        /// Subscription the join was requested under.
        subscription: SubscriptionId,
        /// Reason for the rejection.
        reason: String,
    },
    /// Event on a room subscription.
    Room(RoomEvent),
}

impl<I> From<TransportEvent> for SessionEvent<I> {
    fn from(event: TransportEvent) -> Self {
        match event {
            TransportEvent::Connected => Self::Connected,
            TransportEvent::ConnectFailed { reason } => Self::ConnectFailed { reason },
            TransportEvent::CatalogLoaded(rooms) => Self::CatalogLoaded(rooms),
            TransportEvent::CatalogFailed { reason } => Self::CatalogFailed { reason },
            TransportEvent::JoinFailed { room, subscription, reason } => {
                Self::JoinFailed { room, subscription, reason }
            },
            TransportEvent::Room(event) => Self::Room(event),
        }
    }
}

/// Abstracts the chat transport.
///
/// Requests are fire-and-forget: [`execute`](Transport::execute) only reports
/// whether the request could be handed to the transport. Outcomes arrive
/// later through [`next_event`](Transport::next_event).
///
/// Every room event must carry the [`SubscriptionId`] of the join request
/// that created its subscription.
pub trait Transport: Send {
    /// Transport-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Hand a request to the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent at all.
    fn execute(
        &mut self,
        command: TransportCommand,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Wait for the next event.
    ///
    /// Returns `None` once the transport is closed. Must be cancel safe.
    fn next_event(&mut self) -> impl Future<Output = Option<TransportEvent>> + Send;

    /// Next event if one is ready, without waiting.
    fn try_next_event(&mut self) -> Option<TransportEvent>;
}

/// Event to feed back into the session when a request could not be sent.
///
/// Requests whose failure the session tracks are converted to the matching
/// failure event. Leave, send and logout failures are only logged.
pub(crate) fn failure_event<I>(command: TransportCommand, reason: String) -> Option<SessionEvent<I>> {
    match command {
        TransportCommand::Connect { .. } => Some(SessionEvent::ConnectFailed { reason }),
        TransportCommand::FetchRooms => Some(SessionEvent::CatalogFailed { reason }),
        TransportCommand::Join { room, subscription } => {
            Some(SessionEvent::JoinFailed { room, subscription, reason })
        },
        command @ (TransportCommand::Leave { .. }
        | TransportCommand::Send { .. }
        | TransportCommand::Logout) => {
            tracing::warn!(?command, %reason, "transport request failed");
            None
        },
    }
}
