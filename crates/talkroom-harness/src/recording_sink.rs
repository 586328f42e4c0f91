//! Display sink that records instead of rendering.

use std::convert::Infallible;

use talkroom_app::DisplaySink;
use talkroom_core::{DisplayCommand, RosterChange};

/// Records every display command for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    rendered: Vec<DisplayCommand>,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands rendered so far.
    pub fn rendered(&self) -> &[DisplayCommand] {
        &self.rendered
    }

    /// Take and clear the rendered commands.
    pub fn take(&mut self) -> Vec<DisplayCommand> {
        std::mem::take(&mut self.rendered)
    }

    /// System message texts rendered so far.
    pub fn system_messages(&self) -> Vec<&str> {
        self.rendered
            .iter()
            .filter_map(|c| match c {
                DisplayCommand::SystemMessage { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// One line per rendered command, for transcript snapshots.
    pub fn transcript(&self) -> String {
        self.rendered.iter().map(describe).collect::<Vec<_>>().join("\n")
    }
}

impl DisplaySink for RecordingSink {
    type Error = Infallible;

    fn render(&mut self, command: DisplayCommand) -> Result<(), Infallible> {
        self.rendered.push(command);
        Ok(())
    }
}

/// Compact, timestamp-free description of a display command.
pub fn describe(command: &DisplayCommand) -> String {
    match command {
        DisplayCommand::SystemMessage { text } => format!("* {text}"),
        DisplayCommand::ChatMessage { room, sender, text, is_self, .. } => {
            let me = if *is_self { " (me)" } else { "" };
            format!("[{room}] {sender}{me}: {text}")
        },
        DisplayCommand::Roster { room, members, change } => {
            let change = match change {
                Some(RosterChange::Joined(who)) => format!(" +{who}"),
                Some(RosterChange::Left(who)) => format!(" -{who}"),
                None => String::new(),
            };
            format!("roster {room}: [{}]{change}", members.join(", "))
        },
        DisplayCommand::Catalog { rooms } => {
            let names: Vec<&str> = rooms.iter().map(|r| r.name.as_str()).collect();
            format!("catalog: [{}]", names.join(", "))
        },
        DisplayCommand::RoomBadge { room, unread } => format!("badge {room}: {unread}"),
        DisplayCommand::InputEnabled(on) => format!("input {}", if *on { "on" } else { "off" }),
        DisplayCommand::LeaveVisible(on) => format!("leave {}", if *on { "shown" } else { "hidden" }),
        DisplayCommand::ClearRoom => "clear".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use talkroom_core::RoomDescriptor;

    use super::*;

    #[test]
    fn transcript_describes_each_command() {
        let mut sink = RecordingSink::new();
        let commands = vec![
            DisplayCommand::SystemMessage { text: "You have joined lobby".into() },
            DisplayCommand::Catalog {
                rooms: vec![RoomDescriptor::new("lobby"), RoomDescriptor::new("dev")],
            },
            DisplayCommand::Roster {
                room: "lobby".into(),
                members: vec!["alice".into()],
                change: Some(RosterChange::Left("bob".into())),
            },
            DisplayCommand::ChatMessage {
                room: "lobby".into(),
                sender: "alice".into(),
                text: "hi".into(),
                is_self: true,
                timestamp: SystemTime::UNIX_EPOCH,
            },
            DisplayCommand::RoomBadge { room: "dev".into(), unread: 3 },
            DisplayCommand::InputEnabled(false),
            DisplayCommand::LeaveVisible(true),
            DisplayCommand::ClearRoom,
        ];
        for command in commands {
            let Ok(()) = sink.render(command);
        }

        assert_eq!(sink.system_messages(), ["You have joined lobby"]);
        insta::assert_snapshot!(sink.transcript(), @r"
        * You have joined lobby
        catalog: [lobby, dev]
        roster lobby: [alice] -bob
        [lobby] alice (me): hi
        badge dev: 3
        input off
        leave shown
        clear
        ");

        assert_eq!(sink.take().len(), 8);
        assert!(sink.rendered().is_empty());
    }
}
