//! Observable session state snapshots for invariant checking.
//!
//! Invariants operate on snapshots rather than the live session so every
//! check sees one consistent state.

use std::collections::BTreeMap;

use talkroom_core::{ConnectionState, Environment, Session};

/// Snapshot of one session's observable state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Connection state.
    pub state: ConnectionState,
    /// Local identity.
    pub current_user: Option<String>,
    /// Active room.
    pub active_room: Option<String>,
    /// Target of the in-flight switch.
    pub switch_in_flight: Option<String>,
    /// Live subscriptions, sorted.
    pub tracked_rooms: Vec<String>,
    /// Subscriptions awaiting acknowledgment, sorted.
    pub pending_rooms: Vec<String>,
    /// Room → members in join order, for every room holding a roster.
    pub rosters: BTreeMap<String, Vec<String>>,
    /// Catalog room names in listing order.
    pub catalog: Vec<String>,
}

impl SessionSnapshot {
    /// Capture the observable state of a session.
    pub fn from_session<E: Environment>(session: &Session<E>) -> Self {
        let store = session.subscriptions().rosters();
        let rosters = store.rooms().map(|room| (room.to_owned(), store.snapshot(room))).collect();

        Self {
            state: session.connection_state(),
            current_user: session.current_user().map(str::to_owned),
            active_room: session.active_room().map(str::to_owned),
            switch_in_flight: session.switch_in_flight().map(str::to_owned),
            tracked_rooms: session.tracked_rooms(),
            pending_rooms: session.subscriptions().pending_rooms(),
            rosters,
            catalog: session.catalog().names().map(str::to_owned).collect(),
        }
    }
}
