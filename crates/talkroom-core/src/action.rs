//! Session side-effects.
//!
//! The [`crate::Session`] never performs I/O. It returns [`SessionAction`]s
//! which the runtime executes: transport requests go to the transport, display
//! commands go to the display sink.

use std::time::SystemTime;

use crate::{RoomDescriptor, RosterChange, SubscriptionId};

/// Actions produced by the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Request for the transport. Responses come back as
    /// [`crate::SessionEvent`]s.
    Transport(TransportCommand),
    /// Instruction for the display sink.
    Display(DisplayCommand),
}

impl SessionAction {
    pub(crate) fn system(text: impl Into<String>) -> Self {
        Self::Display(DisplayCommand::SystemMessage { text: text.into() })
    }
}

impl From<TransportCommand> for SessionAction {
    fn from(command: TransportCommand) -> Self {
        Self::Transport(command)
    }
}

impl From<DisplayCommand> for SessionAction {
    fn from(command: DisplayCommand) -> Self {
        Self::Display(command)
    }
}

/// Requests for the transport collaborator.
///
/// Every request is fire-and-forget from the session's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Authenticate and establish the session.
    Connect {
        /// Chosen identity.
        identity: String,
        /// Credential for a registered account. `None` for anonymous use.
        credential: Option<String>,
    },

    /// Fetch the room catalog.
    FetchRooms,

    /// Subscribe to a room's event stream.
    Join {
        /// Room to join.
        room: String,
        /// Handle the transport must attach to this subscription's events.
        subscription: SubscriptionId,
    },

    /// Unsubscribe from a room.
    Leave {
        /// Room to leave.
        room: String,
        /// Subscription being torn down.
        subscription: SubscriptionId,
    },

    /// Publish a message to a room.
    Send {
        /// Target room.
        room: String,
        /// Subscription the message is sent through.
        subscription: SubscriptionId,
        /// Message text, already trimmed.
        text: String,
    },

    /// Tear down the transport-level session.
    Logout,
}

/// Instructions for the display sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCommand {
    /// Show a system notification line.
    SystemMessage {
        /// Notification text.
        text: String,
    },

    /// Show a chat line in the active room.
    ChatMessage {
        /// Room the message was posted to.
        room: String,
        /// Sender identity.
        sender: String,
        /// Message text.
        text: String,
        /// Sender is the current user.
        is_self: bool,
        /// When the message was received.
        timestamp: SystemTime,
    },

    /// Show the roster of the active room.
    Roster {
        /// Room the roster belongs to.
        room: String,
        /// Members in join order.
        members: Vec<String>,
        /// Change that produced this render. `None` for a full snapshot.
        change: Option<RosterChange>,
    },

    /// Show the room catalog.
    Catalog {
        /// Rooms in listing order.
        rooms: Vec<RoomDescriptor>,
    },

    /// Update the unread badge of a tracked room.
    RoomBadge {
        /// Room the badge belongs to.
        room: String,
        /// Messages observed while the room was not active.
        unread: u64,
    },

    /// Enable or disable message input.
    InputEnabled(bool),

    /// Show or hide the leave affordance.
    LeaveVisible(bool),

    /// Clear the message list and roster of the room view.
    ClearRoom,
}
