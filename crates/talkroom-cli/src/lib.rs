//! Terminal client for Talkroom
//!
//! A thin shell over [`talkroom_app::Runtime`]: reads commands from stdin,
//! renders to stdout, and logs to stderr. Runs against an in-process
//! loopback server seeded from the configuration file.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod console;

use std::path::PathBuf;

pub use config::CliConfig;
pub use console::ConsoleSink;
use thiserror::Error;

/// Errors that stop the client.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file could not be read.
    #[error("cannot read config {}: {source}", path.display())]
    ReadConfig {
        /// Path given on the command line
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configuration file is not valid.
    #[error("invalid config {}: {source}", path.display())]
    ParseConfig {
        /// Path given on the command line
        path: PathBuf,
        /// Underlying parse error
        source: serde_json::Error,
    },

    /// Rendering to the terminal failed.
    #[error("terminal output failed: {0}")]
    Output(#[from] std::io::Error),
}
