//! Session invariants for the simulation harness.
//!
//! A [`Scenario`](crate::Scenario) captures a [`SessionSnapshot`] after every
//! command, transport event and tick, and hands it to an
//! [`InvariantRegistry`]. Each registered [`Invariant`] inspects the snapshot
//! for one property of the room session: the active room is acknowledged,
//! rosters hold no duplicates and exist only for subscribed rooms, logout
//! leaves nothing behind.
//!
//! ```ignore
//! let snapshot = SessionSnapshot::from_session(runtime.session());
//! InvariantRegistry::standard().assert_all(&snapshot, "after login");
//! ```

mod checks;
mod snapshot;

pub use checks::{
    ActiveRequiresConnection, ActiveRoomTracked, DisconnectedIsEmpty, RosterUnique,
    RostersMatchSubscriptions, SwitchExcludesActive,
};
pub use snapshot::SessionSnapshot;

/// Outcome of a single check.
pub type InvariantResult = Result<(), Violation>;

/// A failed check.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Invariant that failed.
    pub invariant: &'static str,
    /// Offending state, rendered for the test log.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// One property of the room session.
pub trait Invariant: Send + Sync {
    /// Short snake_case name shown in failures.
    fn name(&self) -> &'static str;

    /// Inspect a snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`Violation`] naming the offending rooms or fields.
    fn check(&self, state: &SessionSnapshot) -> InvariantResult;
}

/// Ordered set of session invariants.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Registry with no checks.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Every check the harness runs by default:
    /// - [`ActiveRoomTracked`]: the active room is acknowledged
    /// - [`RosterUnique`]: no duplicate roster members
    /// - [`RostersMatchSubscriptions`]: rosters exist exactly for subscribed
    ///   rooms
    /// - [`DisconnectedIsEmpty`]: logout leaves nothing behind
    /// - [`ActiveRequiresConnection`]: room activity only while connected
    /// - [`SwitchExcludesActive`]: no active room during a switch
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(ActiveRoomTracked);
        registry.add(RosterUnique);
        registry.add(RostersMatchSubscriptions);
        registry.add(DisconnectedIsEmpty);
        registry.add(ActiveRequiresConnection);
        registry.add(SwitchExcludesActive);
        registry
    }

    /// Register another check.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Run every check and collect the failures.
    ///
    /// # Errors
    ///
    /// Returns every violation, in registration order.
    pub fn check_all(&self, state: &SessionSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Run every check and panic with all failures and `context`.
    #[allow(clippy::panic, reason = "test assertion helper")]
    pub fn assert_all(&self, state: &SessionSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered checks.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if no checks are registered.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
