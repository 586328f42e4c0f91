//! Client configuration file.
//!
//! ```json
//! {
//!   "session": { "tracking_mode": "lazy", "join_timeout_ms": 5000 },
//!   "rooms": [{ "name": "lobby", "description": "Say hi" }],
//!   "peers": { "lobby": ["bob"] }
//! }
//! ```
//!
//! Every field is optional.

use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;
use talkroom_core::{RoomDescriptor, SessionConfig};
use talkroom_harness::SimServer;

use crate::CliError;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Session timeouts and tracking policy.
    pub session: SessionConfig,
    /// Rooms listed by the loopback server.
    pub rooms: Vec<RoomDescriptor>,
    /// Room → users already present on the loopback server.
    pub peers: BTreeMap<String, Vec<String>>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            rooms: vec![
                RoomDescriptor::new("lobby").with_description("General chat"),
                RoomDescriptor::new("dev").with_description("Development talk"),
                RoomDescriptor::new("random"),
            ],
            peers: BTreeMap::new(),
        }
    }
}

impl CliConfig {
    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = fs::read_to_string(path)
            .map_err(|source| CliError::ReadConfig { path: path.to_owned(), source })?;
        serde_json::from_str(&text)
            .map_err(|source| CliError::ParseConfig { path: path.to_owned(), source })
    }

    /// Start an in-process server seeded with the configured rooms and peers.
    pub fn loopback_server(&self) -> SimServer {
        let server = SimServer::new();
        server.set_rooms(self.rooms.clone());
        for (room, people) in &self.peers {
            for person in people {
                server.user_joins(room, person);
            }
        }
        server
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use talkroom_core::TrackingMode;

    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: CliConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn nested_session_settings_are_read() {
        let config: CliConfig = serde_json::from_str(
            r#"{
                "session": { "tracking_mode": "lazy", "join_timeout_ms": 5000 },
                "rooms": [{ "name": "ops" }],
                "peers": { "ops": ["bob"] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.session.tracking_mode, TrackingMode::Lazy);
        assert_eq!(config.session.join_timeout, Duration::from_secs(5));
        assert_eq!(config.rooms, [RoomDescriptor::new("ops")]);

        let server = config.loopback_server();
        assert_eq!(server.present("ops"), ["bob"]);
    }
}
