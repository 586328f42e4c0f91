//! Room session core for Talkroom
//!
//! Sans-IO state machines for a multi-room, presence-aware chat client: one
//! connection, many rooms, per-room rosters kept current in the background,
//! and a single active room rendered at a time.
//!
//! # Components
//!
//! - [`Session`]: connection lifecycle, catalog, active room, switch protocol
//! - [`SubscriptionManager`]: which rooms are subscribed, independent of
//!   which one is displayed
//! - [`EventDispatcher`]: routes room events to rosters and the display
//! - [`RosterStore`]: per-room member sets in join order
//! - [`Environment`]: clock abstraction for deterministic simulation
//!
//! The session never performs I/O. Commands and events go in, and
//! [`SessionAction`]s come out for the runtime to execute.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod config;
mod dispatcher;
mod env;
mod error;
mod event;
mod room;
mod roster;
mod session;
mod state;
mod subscription;

pub use action::{DisplayCommand, SessionAction, TransportCommand};
pub use config::{
    DEFAULT_CATALOG_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_JOIN_TIMEOUT, SessionConfig,
    TrackingMode,
};
pub use dispatcher::{Dispatch, DispatchContext, EventDispatcher};
pub use env::{Environment, SystemEnv};
pub use error::SessionError;
pub use event::{RoomEvent, RoomEventKind, SessionEvent};
pub use room::{Catalog, RoomDescriptor};
pub use roster::{Roster, RosterChange, RosterStore};
pub use session::Session;
pub use state::ConnectionState;
pub use subscription::{
    RoomActivity, Subscription, SubscriptionId, SubscriptionManager, SubscriptionStatus,
    TrackOutcome,
};
