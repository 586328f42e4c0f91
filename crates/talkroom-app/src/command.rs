//! User commands.
//!
//! Line-oriented input: a leading `/` selects a command, anything else is a
//! message for the active room.

use thiserror::Error;

/// Commands issued by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connect as `identity`, optionally with a registered-account credential.
    Login {
        /// Chosen identity.
        identity: String,
        /// Credential. `None` for anonymous use.
        credential: Option<String>,
    },
    /// Make a room active.
    SwitchRoom(String),
    /// Leave the active room.
    LeaveRoom,
    /// Send a message to the active room.
    Send(String),
    /// Fetch the room catalog again.
    RefreshRooms,
    /// Disconnect.
    Logout,
    /// Disconnect and stop the runtime.
    Quit,
}

/// Input line could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unrecognized `/command`.
    #[error("unknown command: /{0}")]
    Unknown(String),

    /// Command is missing a required argument.
    #[error("usage: /{command} <{argument}>")]
    MissingArgument {
        /// Command name
        command: &'static str,
        /// Missing argument
        argument: &'static str,
    },
}

impl Command {
    /// Parse one input line.
    ///
    /// `/login <name> [password]`, `/join <room>`, `/leave`, `/rooms`,
    /// `/logout` and `/quit` are commands. Any other line is sent as a
    /// message.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Ok(Self::Send(line.to_owned()));
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        match name {
            "login" => {
                let identity = words
                    .next()
                    .ok_or(CommandError::MissingArgument { command: "login", argument: "name" })?;
                Ok(Self::Login {
                    identity: identity.to_owned(),
                    credential: words.next().map(str::to_owned),
                })
            },
            "join" => {
                let room = words
                    .next()
                    .ok_or(CommandError::MissingArgument { command: "join", argument: "room" })?;
                Ok(Self::SwitchRoom(room.to_owned()))
            },
            "leave" => Ok(Self::LeaveRoom),
            "rooms" => Ok(Self::RefreshRooms),
            "logout" => Ok(Self::Logout),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_owned())),
        }
    }
}
