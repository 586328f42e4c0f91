//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from system clocks. Production uses
//! [`SystemEnv`]; simulation supplies a virtual clock so timeouts and message
//! timestamps are reproducible.

use std::{
    ops::Sub,
    time::{Duration, Instant, SystemTime},
};

/// Abstract environment providing monotonic and wall-clock time.
///
/// # Invariants
///
/// Implementations MUST guarantee that `now()` never goes backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + Sub<Output = Duration>;

    /// Current time (monotonic). Used for timeout bookkeeping.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time. Used to stamp rendered chat lines.
    fn wall_clock(&self) -> SystemTime;
}

/// Environment backed by the operating system clocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_clock(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let env = SystemEnv::new();
        let first = env.now();
        let second = env.now();
        assert!(second >= first);
    }
}
