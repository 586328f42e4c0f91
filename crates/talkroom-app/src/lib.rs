//! Application layer for Talkroom
//!
//! Generic runtime that drives the [`talkroom_core::Session`] state machine
//! against any transport and display, so simulation tests exercise the same
//! orchestration code that runs in production.
//!
//! # Components
//!
//! - [`Runtime`]: orchestration loop (commands, transport events, ticks)
//! - [`Transport`]: trait for the chat transport
//! - [`DisplaySink`]: trait for rendering
//! - [`Command`]: user commands and their line syntax

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod display;
mod runtime;
mod transport;

pub use command::{Command, CommandError};
pub use display::DisplaySink;
pub use runtime::{DEFAULT_TICK_INTERVAL, Runtime};
pub use transport::{Transport, TransportEvent};
