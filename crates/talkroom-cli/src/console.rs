//! Line-oriented display sink.

use std::{
    io::{self, Write},
    time::{SystemTime, UNIX_EPOCH},
};

use talkroom_app::DisplaySink;
use talkroom_core::{DisplayCommand, RosterChange};

/// Renders display commands as plain text lines.
pub struct ConsoleSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> ConsoleSink<W> {
    /// Render to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> DisplaySink for ConsoleSink<W> {
    type Error = io::Error;

    fn render(&mut self, command: DisplayCommand) -> io::Result<()> {
        match command {
            DisplayCommand::SystemMessage { text } => writeln!(self.out, "*** {text}")?,
            DisplayCommand::ChatMessage { room, sender, text, is_self, timestamp } => {
                let me = if is_self { " (you)" } else { "" };
                writeln!(self.out, "[{}] #{room} <{sender}{me}> {text}", clock(timestamp))?;
            },
            DisplayCommand::Roster { room, members, change } => {
                match change {
                    Some(RosterChange::Joined(who)) => writeln!(self.out, "--> {who} joined #{room}")?,
                    Some(RosterChange::Left(who)) => writeln!(self.out, "<-- {who} left #{room}")?,
                    None => {},
                }
                writeln!(self.out, "Users in #{room}: {}", members.join(", "))?;
            },
            DisplayCommand::Catalog { rooms } => {
                if !rooms.is_empty() {
                    writeln!(self.out, "Rooms:")?;
                }
                for room in rooms {
                    match room.description {
                        Some(description) => writeln!(self.out, "  #{} - {description}", room.name)?,
                        None => writeln!(self.out, "  #{}", room.name)?,
                    }
                }
            },
            DisplayCommand::RoomBadge { room, unread } => {
                if unread > 0 {
                    writeln!(self.out, "(#{room}: {unread} unread)")?;
                }
            },
            DisplayCommand::LeaveVisible(true) => {
                writeln!(self.out, "Type to chat, /join <room> to switch, /leave to leave.")?;
            },
            DisplayCommand::ClearRoom => writeln!(self.out, "----")?,
            DisplayCommand::InputEnabled(_) | DisplayCommand::LeaveVisible(false) => {},
        }
        self.out.flush()
    }
}

/// `HH:MM:SS` in UTC.
fn clock(at: SystemTime) -> String {
    let secs = at.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs()) % 86_400;
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}
