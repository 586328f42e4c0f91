//! End-to-end session scenarios against the simulated server.
//!
//! Every step runs through the production runtime; the standard invariants
//! are checked after each command, event and tick.

use std::time::Duration;

use talkroom_app::{Command, TransportEvent};
use talkroom_core::{
    ConnectionState, DisplayCommand, RoomEvent, RoomEventKind, RosterChange, SessionConfig,
    TrackingMode, TransportCommand,
};
use talkroom_harness::{Scenario, SessionSnapshot, SimServer};

fn eager() -> SessionConfig {
    SessionConfig::default()
}

fn lazy() -> SessionConfig {
    SessionConfig::default().with_tracking_mode(TrackingMode::Lazy)
}

fn chat_lines(scenario: &Scenario) -> Vec<(String, String)> {
    scenario
        .sink()
        .rendered()
        .iter()
        .filter_map(|c| match c {
            DisplayCommand::ChatMessage { room, text, .. } => Some((room.clone(), text.clone())),
            _ => None,
        })
        .collect()
}

fn joins_sent(scenario: &Scenario) -> Vec<String> {
    scenario
        .transport()
        .sent()
        .iter()
        .filter_map(|c| match c {
            TransportCommand::Join { room, .. } => Some(room.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn background_presence_and_silent_background_messages() {
    let server = SimServer::with_rooms(["lobby", "dev"]);
    let mut scenario = Scenario::new(&server, eager());

    scenario.login("alice").await;
    scenario.input("/join lobby").await;
    server.user_joins("lobby", "bob");
    scenario.settle().await;

    let roster = scenario.session().roster("lobby").unwrap();
    assert_eq!(roster.members(), ["alice", "bob"]);
    assert!(scenario.sink().rendered().contains(&DisplayCommand::Roster {
        room: "lobby".into(),
        members: vec!["alice".into(), "bob".into()],
        change: Some(RosterChange::Joined("bob".into())),
    }));

    server.user_says("dev", "carol", "anyone here?");
    scenario.settle().await;

    assert!(chat_lines(&scenario).is_empty());
    insta::assert_snapshot!(scenario.take_transcript(), @r"
    * Connected anonymously as alice
    * Connection established. Loading rooms...
    catalog: [lobby, dev]
    * Rooms loaded. Please select a room to join.
    * You have joined lobby
    roster lobby: [alice]
    badge lobby: 0
    input on
    leave shown
    roster lobby: [alice, bob] +bob
    badge dev: 1
    ");
}

#[tokio::test]
async fn logout_during_pending_switch_discards_late_ack() {
    let server = SimServer::with_rooms(["lobby", "dev"]);
    let mut scenario = Scenario::new(&server, lazy());
    scenario.login("alice").await;

    server.hold_joins();
    scenario.input("/join dev").await;
    assert_eq!(scenario.session().switch_in_flight(), Some("dev"));
    let pending = scenario.session().subscriptions().get("dev").unwrap().id;

    scenario.command(Command::Logout).await;
    server.release_joins();
    scenario.settle().await;

    let rendered = scenario.sink().rendered().len();
    scenario
        .deliver(TransportEvent::Room(RoomEvent::new("dev", pending, RoomEventKind::SelfJoined)))
        .await;

    assert_eq!(scenario.sink().rendered().len(), rendered);
    assert_eq!(SessionSnapshot::from_session(scenario.session()), SessionSnapshot::default());
    assert!(!server.is_connected("alice"));
}

#[tokio::test]
async fn stray_events_after_logout_are_discarded() {
    let server = SimServer::with_rooms(["lobby", "dev"]);
    let mut scenario = Scenario::new(&server, eager());
    scenario.login("alice").await;
    scenario.input("/join lobby").await;
    let lobby = scenario.session().subscriptions().get("lobby").unwrap().id;

    scenario.input("/logout").await;
    assert_eq!(scenario.session().connection_state(), ConnectionState::Disconnected);
    assert_eq!(scenario.session().current_user(), None);
    assert_eq!(scenario.session().active_room(), None);
    assert!(scenario.session().tracked_rooms().is_empty());

    let rendered = scenario.sink().rendered().len();
    for kind in [
        RoomEventKind::UserJoined { nickname: "bob".into() },
        RoomEventKind::Message { sender: "bob".into(), text: "late".into() },
    ] {
        scenario.deliver(TransportEvent::Room(RoomEvent::new("lobby", lobby, kind))).await;
    }
    assert_eq!(scenario.sink().rendered().len(), rendered);
    assert!(scenario.session().roster("lobby").is_none());
}

#[tokio::test]
async fn switch_leaves_before_joining() {
    let server = SimServer::with_rooms(["lobby", "dev"]);
    let mut scenario = Scenario::new(&server, eager());
    scenario.login("alice").await;
    scenario.input("/join lobby").await;
    scenario.take_transcript();

    scenario.input("/join dev").await;

    assert_eq!(scenario.session().active_room(), Some("dev"));
    assert_eq!(scenario.sink().system_messages(), ["You have left lobby", "You have joined dev"]);
}

#[tokio::test]
async fn background_messages_are_not_replayed_on_entry() {
    let server = SimServer::with_rooms(["lobby", "dev"]);
    let mut scenario = Scenario::new(&server, eager());
    scenario.login("alice").await;
    scenario.input("/join lobby").await;

    server.user_says("dev", "bob", "first");
    server.user_says("dev", "bob", "second");
    scenario.settle().await;
    assert_eq!(scenario.session().unread("dev"), 2);

    scenario.input("/join dev").await;
    server.user_says("dev", "bob", "third");
    scenario.settle().await;

    assert_eq!(chat_lines(&scenario), [("dev".to_owned(), "third".to_owned())]);
    assert_eq!(scenario.session().unread("dev"), 0);
}

#[tokio::test]
async fn own_messages_come_back_marked_as_self() {
    let server = SimServer::with_rooms(["lobby"]);
    let mut scenario = Scenario::new(&server, eager());
    scenario.login("alice").await;
    scenario.input("/join lobby").await;

    scenario.input("  hello world  ").await;

    assert!(scenario.sink().rendered().iter().any(|c| matches!(
        c,
        DisplayCommand::ChatMessage { sender, text, is_self: true, .. }
            if sender == "alice" && text == "hello world"
    )));
}

#[tokio::test]
async fn blank_send_is_dropped_silently() {
    let server = SimServer::with_rooms(["lobby"]);
    let mut scenario = Scenario::new(&server, eager());
    scenario.login("alice").await;
    scenario.take_transcript();

    scenario.input("hello?").await;
    scenario.input("/join lobby").await;
    scenario.take_transcript();
    scenario.input("    ").await;

    assert!(scenario.sink().rendered().is_empty());
    assert!(!scenario.transport().sent().iter().any(|c| matches!(c, TransportCommand::Send { .. })));
}

#[tokio::test]
async fn blank_identity_never_reaches_transport() {
    let server = SimServer::with_rooms(["lobby"]);
    let mut scenario = Scenario::new(&server, eager());

    scenario.command(Command::Login { identity: "  ".into(), credential: None }).await;

    assert!(scenario.transport().sent().is_empty());
    assert_eq!(scenario.sink().system_messages(), ["Please enter a nickname to connect."]);
}

#[tokio::test]
async fn registered_account_greeting() {
    let server = SimServer::with_rooms(["lobby"]);
    server.register_account("alice", "s3cret");
    let mut scenario = Scenario::new(&server, eager());

    scenario.input("/login alice s3cret").await;

    assert_eq!(scenario.sink().system_messages()[0], "Connected with registered account alice");
}

#[tokio::test]
async fn refused_connect_is_reported() {
    let server = SimServer::with_rooms(["lobby"]);
    server.refuse_next_connect("server full");
    let mut scenario = Scenario::new(&server, eager());

    scenario.login("alice").await;

    assert_eq!(scenario.sink().system_messages(), ["Connection failed: server full"]);
    assert_eq!(scenario.session().connection_state(), ConnectionState::Disconnected);

    scenario.login("alice").await;
    assert_eq!(scenario.session().connection_state(), ConnectionState::Connected);
}

#[tokio::test]
async fn unreachable_server_fails_connect() {
    let server = SimServer::with_rooms(["lobby"]);
    server.set_offline(true);
    let mut scenario = Scenario::new(&server, eager());

    scenario.login("alice").await;

    assert_eq!(scenario.sink().system_messages(), ["Connection failed: server unreachable"]);
    assert_eq!(scenario.session().connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn failed_catalog_reports_no_rooms() {
    let server = SimServer::with_rooms(["lobby"]);
    server.fail_next_catalog("listing service down");
    let mut scenario = Scenario::new(&server, eager());

    scenario.login("alice").await;

    assert!(scenario.sink().system_messages().contains(&"No rooms are available."));
    assert!(scenario.session().catalog().is_empty());

    scenario.input("/rooms").await;
    assert!(scenario.session().catalog().contains("lobby"));
}

#[tokio::test]
async fn rejected_join_leaves_user_in_no_room() {
    let server = SimServer::with_rooms(["lobby", "vault"]);
    server.reject_joins("vault", "members only");
    let mut scenario = Scenario::new(&server, lazy());
    scenario.login("alice").await;
    scenario.input("/join lobby").await;

    scenario.input("/join vault").await;

    let messages = scenario.sink().system_messages();
    assert_eq!(&messages[messages.len() - 2..], [
        "You have left lobby",
        "Failed to join vault: members only"
    ]);
    assert_eq!(scenario.session().active_room(), None);
    assert!(!scenario.session().tracked_rooms().contains(&"vault".to_owned()));
    assert_eq!(scenario.sink().rendered().last(), Some(&DisplayCommand::SystemMessage {
        text: "Failed to join vault: members only".into()
    }));
}

#[tokio::test]
async fn unacknowledged_join_times_out() {
    let server = SimServer::with_rooms(["dev"]);
    let mut scenario = Scenario::new(&server, lazy());
    scenario.login("alice").await;

    server.hold_joins();
    scenario.input("/join dev").await;
    scenario.advance(Duration::from_secs(29)).await;
    assert_eq!(scenario.session().switch_in_flight(), Some("dev"));

    scenario.advance(Duration::from_secs(1)).await;
    assert_eq!(scenario.session().switch_in_flight(), None);
    assert!(
        scenario
            .sink()
            .system_messages()
            .contains(&"Failed to join dev: join timed out after 30s")
    );

    server.release_joins();
    scenario.settle().await;
    assert_eq!(scenario.session().active_room(), None);
    assert!(server.present("dev").is_empty());
}

#[tokio::test]
async fn join_timeout_follows_config() {
    let server = SimServer::with_rooms(["dev"]);
    let mut scenario = Scenario::new(&server, lazy().with_join_timeout(Duration::from_secs(5)));
    scenario.login("alice").await;

    server.hold_joins();
    scenario.input("/join dev").await;
    scenario.advance(Duration::from_secs(5)).await;

    assert!(
        scenario
            .sink()
            .system_messages()
            .contains(&"Failed to join dev: join timed out after 5s")
    );
}

#[tokio::test]
async fn leave_while_joining_cancels_the_switch() {
    let server = SimServer::with_rooms(["lobby", "dev"]);
    let mut scenario = Scenario::new(&server, lazy());
    scenario.login("alice").await;

    server.hold_joins();
    scenario.input("/join lobby").await;
    scenario.input("/join dev").await;
    scenario.input("/leave").await;
    server.release_joins();
    scenario.settle().await;

    assert_eq!(scenario.session().active_room(), None);
    assert_eq!(scenario.session().switch_in_flight(), None);
    assert!(scenario.session().tracked_rooms().is_empty());
    assert!(server.present("lobby").is_empty());
    assert!(!scenario.sink().system_messages().iter().any(|m| m.starts_with("You have joined")));
}

#[tokio::test]
async fn rapid_switches_are_serialized() {
    let server = SimServer::with_rooms(["a", "b", "c"]);
    let mut scenario = Scenario::new(&server, lazy());
    scenario.login("alice").await;
    scenario.take_transcript();

    server.hold_joins();
    scenario.input("/join a").await;
    scenario.input("/join b").await;
    scenario.input("/join c").await;
    assert_eq!(joins_sent(&scenario), ["a"]);
    assert_eq!(scenario.session().queued_switches().collect::<Vec<_>>(), ["b", "c"]);

    server.release_joins();
    scenario.settle().await;

    assert_eq!(scenario.session().active_room(), Some("c"));
    assert_eq!(joins_sent(&scenario), ["a", "b", "c"]);
    assert_eq!(scenario.sink().system_messages(), [
        "You have joined a",
        "You have left a",
        "You have joined b",
        "You have left b",
        "You have joined c",
    ]);
}

#[tokio::test]
async fn lazy_rejoin_ignores_events_from_old_subscription() {
    let server = SimServer::with_rooms(["lobby", "dev"]);
    let mut scenario = Scenario::new(&server, lazy());
    scenario.login("alice").await;

    scenario.input("/join dev").await;
    let old = scenario.session().subscriptions().get("dev").unwrap().id;
    scenario.input("/leave").await;
    assert!(scenario.session().tracked_rooms().is_empty());
    scenario.input("/join dev").await;
    let current = scenario.session().subscriptions().get("dev").unwrap().id;
    assert_ne!(current, old);
    assert_eq!(server.subscription("alice", "dev"), Some(current));

    server.inject(
        "alice",
        TransportEvent::Room(RoomEvent::new("dev", old, RoomEventKind::UserJoined {
            nickname: "ghost".into(),
        })),
    );
    scenario.settle().await;

    assert!(!scenario.session().roster("dev").unwrap().contains("ghost"));
}

#[tokio::test]
async fn refresh_tracks_new_rooms_in_eager_mode() {
    let server = SimServer::with_rooms(["lobby"]);
    let mut scenario = Scenario::new(&server, eager());
    scenario.login("alice").await;
    assert_eq!(scenario.session().tracked_rooms(), ["lobby"]);

    server.set_rooms(vec![
        talkroom_core::RoomDescriptor::new("lobby"),
        talkroom_core::RoomDescriptor::new("dev").with_description("development"),
    ]);
    scenario.input("/rooms").await;

    assert_eq!(scenario.session().tracked_rooms(), ["dev", "lobby"]);
    assert_eq!(
        scenario.session().catalog().get("dev").and_then(|r| r.description.as_deref()),
        Some("development")
    );
}

#[tokio::test]
async fn quit_logs_out() {
    let server = SimServer::with_rooms(["lobby"]);
    let mut scenario = Scenario::new(&server, eager());
    scenario.login("alice").await;
    scenario.input("/join lobby").await;

    assert!(scenario.command(Command::Quit).await);
    assert!(!server.is_connected("alice"));
    assert!(server.present("lobby").is_empty());
}
