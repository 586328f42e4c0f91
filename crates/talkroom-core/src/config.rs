//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Time allowed for the transport to acknowledge a connect request.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for the room catalog to arrive after connecting.
pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for a room join to be acknowledged.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Which rooms the subscription manager subscribes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    /// Subscribe to every catalog room as soon as the catalog loads, keeping
    /// rosters and unread badges live for rooms that were never opened.
    #[default]
    Eager,
    /// Subscribe only to the room being entered, and drop the subscription
    /// when the room is left.
    Lazy,
}

/// Session configuration.
///
/// Durations are read from millisecond fields when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Room tracking policy.
    pub tracking_mode: TrackingMode,
    /// Timeout for the connect acknowledgment.
    #[serde(rename = "connect_timeout_ms", deserialize_with = "millis")]
    pub connect_timeout: Duration,
    /// Timeout for the catalog fetch.
    #[serde(rename = "catalog_timeout_ms", deserialize_with = "millis")]
    pub catalog_timeout: Duration,
    /// Timeout for each join acknowledgment.
    #[serde(rename = "join_timeout_ms", deserialize_with = "millis")]
    pub join_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tracking_mode: TrackingMode::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            catalog_timeout: DEFAULT_CATALOG_TIMEOUT,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }
}

impl SessionConfig {
    /// Set the tracking mode.
    #[must_use]
    pub fn with_tracking_mode(mut self, mode: TrackingMode) -> Self {
        self.tracking_mode = mode;
        self
    }

    /// Set the join acknowledgment timeout.
    #[must_use]
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Set the connect acknowledgment timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
