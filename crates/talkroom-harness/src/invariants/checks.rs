//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::{BTreeSet, HashSet};

use talkroom_core::ConnectionState;

use super::{Invariant, InvariantResult, SessionSnapshot, Violation};

/// The active room must be a tracked (acknowledged) room.
pub struct ActiveRoomTracked;

impl Invariant for ActiveRoomTracked {
    fn name(&self) -> &'static str {
        "active_room_tracked"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if let Some(active) = &state.active_room
            && !state.tracked_rooms.contains(active)
        {
            return Err(Violation {
                invariant: self.name(),
                message: format!("active room {active} not in tracked {:?}", state.tracked_rooms),
            });
        }
        Ok(())
    }
}

/// No identity appears twice in a roster.
pub struct RosterUnique;

impl Invariant for RosterUnique {
    fn name(&self) -> &'static str {
        "roster_unique"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        for (room, members) in &state.rosters {
            let mut seen = HashSet::new();
            if let Some(dup) = members.iter().find(|m| !seen.insert(m.as_str())) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("room {room}: {dup} listed twice in {members:?}"),
                });
            }
        }
        Ok(())
    }
}

/// Exactly the subscribed rooms (pending or live) hold a roster.
pub struct RostersMatchSubscriptions;

impl Invariant for RostersMatchSubscriptions {
    fn name(&self) -> &'static str {
        "rosters_match_subscriptions"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let subscribed: BTreeSet<&str> =
            state.tracked_rooms.iter().chain(&state.pending_rooms).map(String::as_str).collect();
        let with_roster: BTreeSet<&str> = state.rosters.keys().map(String::as_str).collect();

        if subscribed != with_roster {
            return Err(Violation {
                invariant: self.name(),
                message: format!("subscribed {subscribed:?}, rosters held for {with_roster:?}"),
            });
        }
        Ok(())
    }
}

/// A disconnected session holds nothing.
pub struct DisconnectedIsEmpty;

impl Invariant for DisconnectedIsEmpty {
    fn name(&self) -> &'static str {
        "disconnected_is_empty"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if state.state != ConnectionState::Disconnected {
            return Ok(());
        }
        let leftovers = state.current_user.is_some()
            || state.active_room.is_some()
            || state.switch_in_flight.is_some()
            || !state.tracked_rooms.is_empty()
            || !state.pending_rooms.is_empty()
            || !state.catalog.is_empty();

        if leftovers {
            return Err(Violation {
                invariant: self.name(),
                message: format!("disconnected session still holds state: {state:?}"),
            });
        }
        Ok(())
    }
}

/// Only a connected session has an active room or a switch in flight.
pub struct ActiveRequiresConnection;

impl Invariant for ActiveRequiresConnection {
    fn name(&self) -> &'static str {
        "active_requires_connection"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let busy = state.active_room.is_some() || state.switch_in_flight.is_some();
        if busy && state.state != ConnectionState::Connected {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{:?} session has room activity", state.state),
            });
        }
        Ok(())
    }
}

/// While a switch is in flight no room is active.
pub struct SwitchExcludesActive;

impl Invariant for SwitchExcludesActive {
    fn name(&self) -> &'static str {
        "switch_excludes_active"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if let (Some(target), Some(active)) = (&state.switch_in_flight, &state.active_room) {
            return Err(Violation {
                invariant: self.name(),
                message: format!("switching to {target} while {active} is active"),
            });
        }
        Ok(())
    }
}
