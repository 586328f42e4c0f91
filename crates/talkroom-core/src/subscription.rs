//! Room subscription manager.
//!
//! Owns the set of rooms subscribed to on the transport, independent of which
//! room is displayed. Every join request mints a fresh [`SubscriptionId`] and
//! every transport event carries the id of the subscription that produced it.
//! Dropping the entry is therefore enough to detach a subscription: late
//! events carrying an old id no longer match and are discarded.
//!
//! # Lifecycle
//!
//! ```text
//!   track()       SelfJoined ack
//!  ────────> Pending ─────────────> Live
//!               │                    │
//!               │ JoinFailed/timeout │ untrack()/teardown()
//!               ↓                    ↓
//!            (removed)           (removed)
//! ```
//!
//! Only `Live` subscriptions count as tracked rooms. A pending subscription
//! already owns a roster entry so events ordered after the acknowledgment are
//! never lost.

use std::{collections::HashMap, fmt, ops::Sub, time::Duration};

use crate::{
    TrackingMode,
    action::TransportCommand,
    roster::{Roster, RosterStore},
};

/// Opaque handle for one transport subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Where a subscription is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus<I> {
    /// Join requested, acknowledgment outstanding.
    Pending {
        /// When the join was requested.
        requested_at: I,
    },
    /// Join acknowledged.
    Live,
}

/// Message bookkeeping for a subscribed room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoomActivity {
    /// Messages observed since the subscription was created.
    pub messages: u64,
    /// Messages observed while the room was not active.
    pub unread: u64,
}

/// One room subscription.
#[derive(Debug, Clone)]
pub struct Subscription<I> {
    /// Room name.
    pub room: String,
    /// Handle carried by this subscription's events.
    pub id: SubscriptionId,
    /// Lifecycle status.
    pub status: SubscriptionStatus<I>,
    /// Message bookkeeping.
    pub activity: RoomActivity,
}

impl<I> Subscription<I> {
    /// Check whether the join has been acknowledged.
    pub fn is_live(&self) -> bool {
        matches!(self.status, SubscriptionStatus::Live)
    }
}

/// Result of a [`SubscriptionManager::track`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Room was already live.
    Live(SubscriptionId),
    /// A join for the room is already outstanding.
    Pending(SubscriptionId),
    /// A new join was requested. The caller must issue the command.
    Requested {
        /// Handle minted for the new subscription.
        subscription: SubscriptionId,
        /// Join command for the transport.
        command: TransportCommand,
    },
}

impl TrackOutcome {
    /// Subscription the room is (or will be) tracked under.
    pub fn subscription(&self) -> SubscriptionId {
        match self {
            Self::Live(id) | Self::Pending(id) | Self::Requested { subscription: id, .. } => *id,
        }
    }

    /// Transport command to issue, if any.
    pub fn into_command(self) -> Option<TransportCommand> {
        match self {
            Self::Requested { command, .. } => Some(command),
            Self::Live(_) | Self::Pending(_) => None,
        }
    }
}

/// Subscription manager.
///
/// Generic over the instant type so join timeouts run on virtual time in
/// simulation.
#[derive(Debug, Clone)]
pub struct SubscriptionManager<I> {
    mode: TrackingMode,
    next_id: u64,
    subscriptions: HashMap<String, Subscription<I>>,
    rosters: RosterStore,
}

impl<I> SubscriptionManager<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a manager with the given tracking policy.
    pub fn new(mode: TrackingMode) -> Self {
        Self { mode, next_id: 1, subscriptions: HashMap::new(), rosters: RosterStore::new() }
    }

    /// Tracking policy.
    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    /// Subscribe to a room. Idempotent.
    ///
    /// A new subscription starts `Pending` with an empty roster; the caller
    /// must issue the returned join command.
    pub fn track(&mut self, room: &str, now: I) -> TrackOutcome {
        if let Some(existing) = self.subscriptions.get(room) {
            return match existing.status {
                SubscriptionStatus::Live => TrackOutcome::Live(existing.id),
                SubscriptionStatus::Pending { .. } => TrackOutcome::Pending(existing.id),
            };
        }

        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        self.subscriptions.insert(room.to_owned(), Subscription {
            room: room.to_owned(),
            id,
            status: SubscriptionStatus::Pending { requested_at: now },
            activity: RoomActivity::default(),
        });
        self.rosters.ensure(room);

        tracing::debug!(room, subscription = %id, "join requested");
        TrackOutcome::Requested {
            subscription: id,
            command: TransportCommand::Join { room: room.to_owned(), subscription: id },
        }
    }

    /// Subscribe to every room in a listing.
    ///
    /// Returns the join commands for rooms that were not yet subscribed.
    pub fn track_all<'a>(
        &mut self,
        rooms: impl IntoIterator<Item = &'a str>,
        now: I,
    ) -> Vec<TransportCommand> {
        rooms.into_iter().filter_map(|room| self.track(room, now).into_command()).collect()
    }

    /// Unsubscribe from a room. No-op if the room has no subscription.
    ///
    /// Discards the roster and returns the leave command for the transport.
    pub fn untrack(&mut self, room: &str) -> Option<TransportCommand> {
        let subscription = self.subscriptions.remove(room)?;
        self.rosters.discard(room);
        tracing::debug!(room, subscription = %subscription.id, "unsubscribed");
        Some(TransportCommand::Leave { room: subscription.room, subscription: subscription.id })
    }

    /// Unsubscribe from every room, pending or live.
    pub fn teardown(&mut self) -> Vec<TransportCommand> {
        let mut rooms: Vec<String> = self.subscriptions.keys().cloned().collect();
        rooms.sort();
        rooms.iter().filter_map(|room| self.untrack(room)).collect()
    }

    /// Check whether an event from `(room, id)` belongs to a current
    /// subscription.
    pub fn accepts(&self, room: &str, id: SubscriptionId) -> bool {
        self.subscriptions.get(room).is_some_and(|s| s.id == id)
    }

    /// Promote a pending subscription to live.
    ///
    /// Returns `true` if this call performed the promotion.
    pub(crate) fn acknowledge(&mut self, room: &str, id: SubscriptionId) -> bool {
        match self.subscriptions.get_mut(room) {
            Some(sub) if sub.id == id && !sub.is_live() => {
                sub.status = SubscriptionStatus::Live;
                tracing::debug!(room, subscription = %id, "join acknowledged");
                true
            },
            _ => false,
        }
    }

    /// Drop a pending subscription whose join was rejected.
    ///
    /// Returns `false` if `(room, id)` is not a pending subscription.
    pub(crate) fn reject(&mut self, room: &str, id: SubscriptionId) -> bool {
        match self.subscriptions.get(room) {
            Some(sub) if sub.id == id && !sub.is_live() => {
                self.subscriptions.remove(room);
                self.rosters.discard(room);
                true
            },
            _ => false,
        }
    }

    /// Pending subscriptions older than `timeout` at `now`.
    pub fn expired(&self, now: I, timeout: Duration) -> Vec<(String, SubscriptionId)> {
        let mut expired: Vec<_> = self
            .subscriptions
            .values()
            .filter(|s| match s.status {
                SubscriptionStatus::Pending { requested_at } => now - requested_at >= timeout,
                SubscriptionStatus::Live => false,
            })
            .map(|s| (s.room.clone(), s.id))
            .collect();
        expired.sort();
        expired
    }

    /// Subscription for a room, pending or live.
    pub fn get(&self, room: &str) -> Option<&Subscription<I>> {
        self.subscriptions.get(room)
    }

    pub(crate) fn activity_mut(&mut self, room: &str) -> Option<&mut RoomActivity> {
        self.subscriptions.get_mut(room).map(|s| &mut s.activity)
    }

    /// Check whether a room is tracked (subscription acknowledged).
    pub fn is_tracked(&self, room: &str) -> bool {
        self.subscriptions.get(room).is_some_and(Subscription::is_live)
    }

    /// Check whether a join for a room is outstanding.
    pub fn is_pending(&self, room: &str) -> bool {
        self.subscriptions.get(room).is_some_and(|s| !s.is_live())
    }

    /// Tracked room names, sorted.
    pub fn tracked_rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> =
            self.subscriptions.values().filter(|s| s.is_live()).map(|s| s.room.clone()).collect();
        rooms.sort();
        rooms
    }

    /// Rooms with an outstanding join, sorted.
    pub fn pending_rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> =
            self.subscriptions.values().filter(|s| !s.is_live()).map(|s| s.room.clone()).collect();
        rooms.sort();
        rooms
    }

    /// Roster for a subscribed room.
    pub fn roster(&self, room: &str) -> Option<&Roster> {
        self.rosters.get(room)
    }

    /// All rosters (read-only).
    pub fn rosters(&self) -> &RosterStore {
        &self.rosters
    }

    /// Mutable roster access, reserved for the event dispatcher.
    pub(crate) fn rosters_mut(&mut self) -> &mut RosterStore {
        &mut self.rosters
    }
}
