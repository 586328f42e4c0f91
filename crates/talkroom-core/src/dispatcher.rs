//! Event dispatcher.
//!
//! Routes room events to roster updates (always) and to the display (only for
//! the active room). Events are applied one at a time in arrival order; the
//! dispatcher never reorders or batches events of the same room.

use std::{
    ops::Sub,
    time::{Duration, SystemTime},
};

use crate::{
    DisplayCommand, RoomEvent, RoomEventKind, RosterChange, SessionAction,
    subscription::SubscriptionManager,
};

/// Session state the dispatcher reads while applying an event.
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext<'a> {
    /// Local identity. `None` while disconnected.
    pub current_user: Option<&'a str>,
    /// Room currently displayed. `None` if no room is active.
    pub active_room: Option<&'a str>,
    /// Receive time stamped onto chat lines.
    pub received_at: SystemTime,
}

impl DispatchContext<'_> {
    fn is_active(&self, room: &str) -> bool {
        self.active_room == Some(room)
    }
}

/// Outcome of dispatching one event.
#[derive(Debug, Default)]
pub struct Dispatch {
    /// Display commands to execute.
    pub actions: Vec<SessionAction>,
    /// The event acknowledged a pending join.
    pub acknowledged: bool,
}

/// Stateless router from room events to roster updates and renders.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDispatcher;

impl EventDispatcher {
    /// Apply a room event.
    ///
    /// Events whose `(room, subscription)` pair does not match a current
    /// subscription are discarded without effect.
    pub fn dispatch<I>(
        &self,
        subscriptions: &mut SubscriptionManager<I>,
        ctx: &DispatchContext<'_>,
        event: RoomEvent,
    ) -> Dispatch
    where
        I: Copy + Ord + Sub<Output = Duration>,
    {
        let RoomEvent { room, subscription, kind } = event;

        if !subscriptions.accepts(&room, subscription) {
            tracing::warn!(room = %room, %subscription, ?kind, "discarding event for detached subscription");
            return Dispatch::default();
        }

        let mut dispatch = Dispatch::default();
        match kind {
            RoomEventKind::SelfJoined => {
                dispatch.acknowledged = subscriptions.acknowledge(&room, subscription);
                if let Some(me) = ctx.current_user {
                    let added = subscriptions.rosters_mut().insert(&room, me);
                    if added && !dispatch.acknowledged {
                        dispatch.actions.extend(roster_changed(
                            subscriptions,
                            ctx,
                            &room,
                            RosterChange::Joined(me.to_owned()),
                        ));
                    }
                }
            },
            RoomEventKind::UserJoined { nickname } => {
                if subscriptions.rosters_mut().insert(&room, &nickname) {
                    dispatch.actions.extend(roster_changed(
                        subscriptions,
                        ctx,
                        &room,
                        RosterChange::Joined(nickname),
                    ));
                }
            },
            RoomEventKind::UserLeft { nickname } => {
                if subscriptions.rosters_mut().remove(&room, &nickname) {
                    dispatch.actions.extend(roster_changed(
                        subscriptions,
                        ctx,
                        &room,
                        RosterChange::Left(nickname),
                    ));
                }
            },
            RoomEventKind::Message { sender, text } => {
                let active = ctx.is_active(&room);
                let Some(activity) = subscriptions.activity_mut(&room) else {
                    return dispatch;
                };
                activity.messages += 1;

                if active {
                    let is_self = ctx.current_user == Some(sender.as_str());
                    dispatch.actions.push(SessionAction::Display(DisplayCommand::ChatMessage {
                        room,
                        sender,
                        text,
                        is_self,
                        timestamp: ctx.received_at,
                    }));
                } else {
                    activity.unread += 1;
                    let unread = activity.unread;
                    tracing::trace!(room = %room, unread, "message for inactive room");
                    dispatch
                        .actions
                        .push(SessionAction::Display(DisplayCommand::RoomBadge { room, unread }));
                }
            },
        }

        dispatch
    }
}

/// Roster render for the active room, nothing for background rooms.
fn roster_changed<I>(
    subscriptions: &SubscriptionManager<I>,
    ctx: &DispatchContext<'_>,
    room: &str,
    change: RosterChange,
) -> Option<SessionAction>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    if !ctx.is_active(room) {
        return None;
    }
    Some(SessionAction::Display(DisplayCommand::Roster {
        room: room.to_owned(),
        members: subscriptions.rosters().snapshot(room),
        change: Some(change),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SubscriptionId, TrackingMode};

    fn live(subs: &mut SubscriptionManager<Duration>, room: &str) -> SubscriptionId {
        let id = subs.track(room, Duration::ZERO).subscription();
        subs.acknowledge(room, id);
        id
    }

    fn ctx<'a>(active: Option<&'a str>) -> DispatchContext<'a> {
        DispatchContext {
            current_user: Some("alice"),
            active_room: active,
            received_at: SystemTime::UNIX_EPOCH,
        }
    }

    fn joined(room: &str, id: SubscriptionId, nickname: &str) -> RoomEvent {
        RoomEvent::new(room, id, RoomEventKind::UserJoined { nickname: nickname.into() })
    }

    #[test]
    fn self_join_acknowledges_and_adds_current_user() {
        let mut subs = SubscriptionManager::new(TrackingMode::Eager);
        let id = subs.track("lobby", Duration::ZERO).subscription();

        let dispatch = EventDispatcher.dispatch(
            &mut subs,
            &ctx(None),
            RoomEvent::new("lobby", id, RoomEventKind::SelfJoined),
        );

        assert!(dispatch.acknowledged);
        assert!(subs.is_tracked("lobby"));
        assert_eq!(subs.rosters().snapshot("lobby"), ["alice"]);
    }

    #[test]
    fn join_in_active_room_renders_roster() {
        let mut subs = SubscriptionManager::new(TrackingMode::Eager);
        let id = live(&mut subs, "lobby");

        let dispatch = EventDispatcher.dispatch(&mut subs, &ctx(Some("lobby")), joined("lobby", id, "bob"));

        assert_eq!(dispatch.actions, vec![SessionAction::Display(DisplayCommand::Roster {
            room: "lobby".into(),
            members: vec!["bob".into()],
            change: Some(RosterChange::Joined("bob".into())),
        })]);
    }

    #[test]
    fn join_in_background_room_updates_roster_silently() {
        let mut subs = SubscriptionManager::new(TrackingMode::Eager);
        let id = live(&mut subs, "dev");

        let dispatch = EventDispatcher.dispatch(&mut subs, &ctx(Some("lobby")), joined("dev", id, "bob"));

        assert!(dispatch.actions.is_empty());
        assert_eq!(subs.rosters().snapshot("dev"), ["bob"]);
    }

    #[test]
    fn duplicate_join_is_absorbed() {
        let mut subs = SubscriptionManager::new(TrackingMode::Eager);
        let id = live(&mut subs, "lobby");

        let _ = EventDispatcher.dispatch(&mut subs, &ctx(Some("lobby")), joined("lobby", id, "bob"));
        let second = EventDispatcher.dispatch(&mut subs, &ctx(Some("lobby")), joined("lobby", id, "bob"));

        assert!(second.actions.is_empty());
        assert_eq!(subs.rosters().snapshot("lobby"), ["bob"]);
    }

    #[test]
    fn leave_removes_member() {
        let mut subs = SubscriptionManager::new(TrackingMode::Eager);
        let id = live(&mut subs, "lobby");
        let _ = EventDispatcher.dispatch(&mut subs, &ctx(None), joined("lobby", id, "bob"));

        let _ = EventDispatcher.dispatch(
            &mut subs,
            &ctx(None),
            RoomEvent::new("lobby", id, RoomEventKind::UserLeft { nickname: "bob".into() }),
        );

        assert!(subs.rosters().snapshot("lobby").is_empty());
    }

    #[test]
    fn background_message_bumps_badge_only() {
        let mut subs = SubscriptionManager::new(TrackingMode::Eager);
        let id = live(&mut subs, "dev");

        let event = RoomEvent::new("dev", id, RoomEventKind::Message {
            sender: "bob".into(),
            text: "hi".into(),
        });
        let dispatch = EventDispatcher.dispatch(&mut subs, &ctx(Some("lobby")), event);

        assert_eq!(dispatch.actions, vec![SessionAction::Display(DisplayCommand::RoomBadge {
            room: "dev".into(),
            unread: 1,
        })]);
        assert_eq!(subs.get("dev").map(|s| s.activity.messages), Some(1));
    }

    #[test]
    fn own_message_in_active_room_is_marked_self() {
        let mut subs = SubscriptionManager::new(TrackingMode::Eager);
        let id = live(&mut subs, "lobby");

        let event = RoomEvent::new("lobby", id, RoomEventKind::Message {
            sender: "alice".into(),
            text: "hello".into(),
        });
        let dispatch = EventDispatcher.dispatch(&mut subs, &ctx(Some("lobby")), event);

        assert!(matches!(
            dispatch.actions.as_slice(),
            [SessionAction::Display(DisplayCommand::ChatMessage { is_self: true, .. })]
        ));
    }

    #[test]
    fn stale_subscription_is_discarded() {
        let mut subs = SubscriptionManager::new(TrackingMode::Eager);
        let old = live(&mut subs, "lobby");
        let _ = subs.untrack("lobby");
        let _new = live(&mut subs, "lobby");

        let dispatch = EventDispatcher.dispatch(&mut subs, &ctx(Some("lobby")), joined("lobby", old, "bob"));

        assert!(dispatch.actions.is_empty());
        assert!(!dispatch.acknowledged);
        assert!(subs.rosters().snapshot("lobby").is_empty());
    }
}
