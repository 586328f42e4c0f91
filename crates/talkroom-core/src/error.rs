//! Error types for the room session core.
//!
//! Every command on [`crate::Session`] returns these errors directly, and the
//! asynchronous failure paths (rejected connect, empty catalog, rejected join)
//! are rendered from them so the user sees one consistent wording.

use std::time::Duration;

use thiserror::Error;

use crate::ConnectionState;

/// Errors produced by the session state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Identity was empty or whitespace-only. No network call was attempted.
    #[error("Please enter a nickname to connect.")]
    InvalidIdentity,

    /// Command is not valid in the current connection state.
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        /// State when the command was issued
        state: ConnectionState,
        /// Command that was attempted
        operation: &'static str,
    },

    /// Room is not present in the catalog.
    #[error("Room {room} is not available.")]
    UnknownRoom {
        /// Requested room name
        room: String,
    },

    /// Transport rejected or failed the connect request.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Reason reported by the transport
        reason: String,
    },

    /// Catalog fetch failed or returned no rooms.
    #[error("No rooms are available.")]
    CatalogUnavailable {
        /// Reason reported by the transport, empty for an empty catalog
        reason: String,
    },

    /// Transport rejected the join, or the acknowledgment never arrived.
    #[error("Failed to join {room}: {reason}")]
    JoinFailed {
        /// Room that could not be joined
        room: String,
        /// Reason reported by the transport
        reason: String,
    },

    /// Message was dropped before reaching the transport.
    #[error("message not sent: {reason}")]
    SendIgnored {
        /// Why the message was dropped
        reason: &'static str,
    },
}

impl SessionError {
    /// Build the error used when an acknowledgment does not arrive in time.
    pub fn timed_out(operation: &str, elapsed: Duration) -> String {
        format!("{operation} timed out after {elapsed:?}")
    }

    /// Returns true if this error is dropped without telling the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::SendIgnored { .. })
    }

    /// Returns true if repeating the operation later may succeed.
    ///
    /// Input validation failures are never transient; transport failures are,
    /// although the session itself never retries automatically.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::CatalogUnavailable { .. } | Self::JoinFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_send_ignored_is_silent() {
        assert!(SessionError::SendIgnored { reason: "empty message" }.is_silent());
        assert!(!SessionError::InvalidIdentity.is_silent());
        assert!(!SessionError::JoinFailed { room: "dev".into(), reason: "full".into() }.is_silent());
    }

    #[test]
    fn transport_failures_are_transient() {
        assert!(SessionError::ConnectionFailed { reason: "refused".into() }.is_transient());
        assert!(SessionError::CatalogUnavailable { reason: String::new() }.is_transient());
        assert!(!SessionError::InvalidIdentity.is_transient());
        assert!(!SessionError::UnknownRoom { room: "x".into() }.is_transient());
        assert!(
            !SessionError::InvalidState {
                state: ConnectionState::Disconnected,
                operation: "switch room",
            }
            .is_transient()
        );
    }

    #[test]
    fn join_failure_names_the_room() {
        let err = SessionError::JoinFailed { room: "dev".into(), reason: "rejected".into() };
        assert_eq!(err.to_string(), "Failed to join dev: rejected");
    }

    #[test]
    fn timeout_reason_mentions_elapsed() {
        let reason = SessionError::timed_out("join", Duration::from_secs(30));
        assert_eq!(reason, "join timed out after 30s");
    }
}
