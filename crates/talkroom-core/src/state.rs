//! Observable session state types.

/// Connection state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected. No tracked rooms, no current user.
    #[default]
    Disconnected,
    /// Connect requested, acknowledgment outstanding.
    Connecting,
    /// Connected with an established transport session.
    Connected,
}
