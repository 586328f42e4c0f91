//! Per-room presence rosters.
//!
//! A [`Roster`] is a set of identities kept in join order, because that is the
//! order the room view lists members in. [`RosterStore`] maps room names to
//! rosters. Only the event dispatcher mutates the store; the session reads it
//! to build snapshots.

use std::collections::HashMap;

/// Change applied to a roster, attached to roster renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    /// Identity became present.
    Joined(String),
    /// Identity left.
    Left(String),
}

/// Identities present in one room.
///
/// # Invariants
///
/// An identity appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    members: Vec<String>,
}

impl Roster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identity. Returns `false` if it was already present.
    pub fn insert(&mut self, identity: &str) -> bool {
        if self.contains(identity) {
            return false;
        }
        self.members.push(identity.to_owned());
        true
    }

    /// Remove an identity. Returns `false` if it was not present.
    pub fn remove(&mut self, identity: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != identity);
        self.members.len() != before
    }

    /// Check whether an identity is present.
    pub fn contains(&self, identity: &str) -> bool {
        self.members.iter().any(|m| m == identity)
    }

    /// Members in join order.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if nobody is present.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Rosters for every room with a subscription.
#[derive(Debug, Clone, Default)]
pub struct RosterStore {
    rosters: HashMap<String, Roster>,
}

impl RosterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty roster for a room if none exists.
    pub fn ensure(&mut self, room: &str) {
        if !self.rosters.contains_key(room) {
            self.rosters.insert(room.to_owned(), Roster::new());
        }
    }

    /// Add an identity to a room's roster.
    ///
    /// Returns `false` if the room has no roster or the identity was present.
    pub fn insert(&mut self, room: &str, identity: &str) -> bool {
        self.rosters.get_mut(room).is_some_and(|r| r.insert(identity))
    }

    /// Remove an identity from a room's roster.
    ///
    /// Returns `false` if the room has no roster or the identity was absent.
    pub fn remove(&mut self, room: &str, identity: &str) -> bool {
        self.rosters.get_mut(room).is_some_and(|r| r.remove(identity))
    }

    /// Roster for a room. `None` if the room has no roster.
    pub fn get(&self, room: &str) -> Option<&Roster> {
        self.rosters.get(room)
    }

    /// Copy of a room's members in join order. Empty if the room is unknown.
    pub fn snapshot(&self, room: &str) -> Vec<String> {
        self.rosters.get(room).map(|r| r.members().to_vec()).unwrap_or_default()
    }

    /// Drop a room's roster.
    pub fn discard(&mut self, room: &str) {
        self.rosters.remove(room);
    }

    /// Rooms that currently have a roster.
    pub fn rooms(&self) -> impl Iterator<Item = &str> {
        self.rosters.keys().map(String::as_str)
    }
}
