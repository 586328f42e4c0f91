//! Deterministic simulation harness for Talkroom session testing.
//!
//! In-process implementations of the Environment, Transport and display
//! traits, so the production [`talkroom_app::Runtime`] can be driven step by
//! step against a scripted server.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the session
//! invariants; [`Scenario`] checks them after every step.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod recording_sink;
pub mod scenario;
pub mod sim_env;
pub mod sim_server;
pub mod sim_transport;

pub use invariants::{
    ActiveRequiresConnection, ActiveRoomTracked, DisconnectedIsEmpty, Invariant,
    InvariantRegistry, InvariantResult, RosterUnique, RostersMatchSubscriptions, SessionSnapshot,
    SwitchExcludesActive, Violation,
};
pub use recording_sink::{RecordingSink, describe};
pub use scenario::{Scenario, SimRuntime};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_server::SimServer;
pub use sim_transport::{SimTransport, SimTransportError};
