//! In-process chat server for simulation.
//!
//! `SimServer` keeps the server side of every connected [`SimTransport`] in
//! one shared state: the room listing, registered accounts, who is present in
//! each room, and the subscription each client joined a room under. Events
//! are pushed into each client's channel synchronously, so delivery order is
//! fully deterministic.
//!
//! Tests script other users directly ([`SimServer::user_joins`],
//! [`SimServer::user_says`]) and inject faults (refused connects, failed
//! listings, rejected or held joins, stray events on stale subscriptions).

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use talkroom_app::TransportEvent;
use talkroom_core::{RoomDescriptor, RoomEvent, RoomEventKind, SubscriptionId};
use tokio::sync::mpsc;

use crate::SimTransport;

/// Server side of one connected client.
struct ClientEntry {
    outbox: mpsc::UnboundedSender<TransportEvent>,
    /// Room → subscription the client joined it under.
    subscriptions: HashMap<String, SubscriptionId>,
}

impl ClientEntry {
    fn deliver(&self, event: TransportEvent) {
        if self.outbox.send(event).is_err() {
            tracing::trace!("client transport dropped, event lost");
        }
    }
}

/// Join waiting for [`SimServer::release_joins`].
struct HeldJoin {
    identity: String,
    room: String,
    subscription: SubscriptionId,
}

#[derive(Default)]
struct ServerState {
    catalog: Vec<RoomDescriptor>,
    accounts: HashMap<String, String>,
    /// Room → identities present, in arrival order.
    present: HashMap<String, Vec<String>>,
    clients: HashMap<String, ClientEntry>,
    offline: bool,
    refuse_connect: Option<String>,
    fail_catalog: Option<String>,
    rejected: HashMap<String, String>,
    hold_joins: bool,
    held: Vec<HeldJoin>,
}

impl ServerState {
    /// Deliver a room event to every client subscribed to `room`.
    fn broadcast(&self, room: &str, kind: &RoomEventKind, exclude: Option<&str>) {
        for (identity, client) in &self.clients {
            if exclude == Some(identity.as_str()) {
                continue;
            }
            if let Some(&subscription) = client.subscriptions.get(room) {
                client.deliver(TransportEvent::Room(RoomEvent::new(room, subscription, kind.clone())));
            }
        }
    }

    fn enter(&mut self, room: &str, identity: &str) -> bool {
        let present = self.present.entry(room.to_owned()).or_default();
        if present.iter().any(|m| m == identity) {
            return false;
        }
        present.push(identity.to_owned());
        true
    }

    fn exit(&mut self, room: &str, identity: &str) -> bool {
        let Some(present) = self.present.get_mut(room) else {
            return false;
        };
        let before = present.len();
        present.retain(|m| m != identity);
        present.len() != before
    }

    /// Acknowledge a join: replay who is present, announce the joiner, then
    /// confirm the subscription.
    fn complete_join(&mut self, identity: &str, room: &str, subscription: SubscriptionId) {
        let joined = self
            .clients
            .get(identity)
            .is_some_and(|c| c.subscriptions.get(room) == Some(&subscription));
        if !joined {
            tracing::debug!(identity, room, %subscription, "join withdrawn before acknowledgment");
            return;
        }

        let others: Vec<String> = self
            .present
            .get(room)
            .map(|p| p.iter().filter(|m| *m != identity).cloned().collect())
            .unwrap_or_default();

        if self.enter(room, identity) {
            let joined = RoomEventKind::UserJoined { nickname: identity.to_owned() };
            self.broadcast(room, &joined, Some(identity));
        }

        if let Some(client) = self.clients.get(identity) {
            for nickname in others {
                let kind = RoomEventKind::UserJoined { nickname };
                client.deliver(TransportEvent::Room(RoomEvent::new(room, subscription, kind)));
            }
            client.deliver(TransportEvent::Room(RoomEvent::new(
                room,
                subscription,
                RoomEventKind::SelfJoined,
            )));
        }
    }

    fn leave(&mut self, identity: &str, room: &str) {
        let Some(client) = self.clients.get_mut(identity) else {
            return;
        };
        if client.subscriptions.remove(room).is_none() {
            return;
        }
        if self.exit(room, identity) {
            let left = RoomEventKind::UserLeft { nickname: identity.to_owned() };
            self.broadcast(room, &left, None);
        }
    }
}

/// Shared handle to the simulated server.
///
/// Clones share the same server.
#[derive(Clone, Default)]
pub struct SimServer {
    state: Arc<Mutex<ServerState>>,
}

impl SimServer {
    /// Create a server with no rooms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a server listing the given rooms, without descriptions.
    pub fn with_rooms<'a>(rooms: impl IntoIterator<Item = &'a str>) -> Self {
        let server = Self::new();
        server.set_rooms(rooms.into_iter().map(RoomDescriptor::new).collect());
        server
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new client connection to this server.
    pub fn transport(&self) -> SimTransport {
        SimTransport::new(self.clone())
    }

    /// Replace the room listing returned by future fetches.
    pub fn set_rooms(&self, rooms: Vec<RoomDescriptor>) {
        self.state().catalog = rooms;
    }

    /// Register an account. Connecting as `identity` then requires
    /// `credential`.
    pub fn register_account(&self, identity: &str, credential: &str) {
        self.state().accounts.insert(identity.to_owned(), credential.to_owned());
    }

    /// Make every transport request fail to send.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Refuse the next connect request.
    pub fn refuse_next_connect(&self, reason: &str) {
        self.state().refuse_connect = Some(reason.to_owned());
    }

    /// Fail the next room listing fetch.
    pub fn fail_next_catalog(&self, reason: &str) {
        self.state().fail_catalog = Some(reason.to_owned());
    }

    /// Reject every join of `room`.
    pub fn reject_joins(&self, room: &str, reason: &str) {
        self.state().rejected.insert(room.to_owned(), reason.to_owned());
    }

    /// Hold join acknowledgments until [`release_joins`](Self::release_joins).
    pub fn hold_joins(&self) {
        self.state().hold_joins = true;
    }

    /// Acknowledge every held join in request order and stop holding.
    pub fn release_joins(&self) {
        let mut state = self.state();
        state.hold_joins = false;
        for held in std::mem::take(&mut state.held) {
            state.complete_join(&held.identity, &held.room, held.subscription);
        }
    }

    /// A scripted user enters `room`.
    pub fn user_joins(&self, room: &str, nickname: &str) {
        let mut state = self.state();
        if state.enter(room, nickname) {
            let kind = RoomEventKind::UserJoined { nickname: nickname.to_owned() };
            state.broadcast(room, &kind, None);
        }
    }

    /// A scripted user leaves `room`.
    pub fn user_leaves(&self, room: &str, nickname: &str) {
        let mut state = self.state();
        if state.exit(room, nickname) {
            let kind = RoomEventKind::UserLeft { nickname: nickname.to_owned() };
            state.broadcast(room, &kind, None);
        }
    }

    /// A scripted user posts to `room`.
    pub fn user_says(&self, room: &str, nickname: &str, text: &str) {
        let kind = RoomEventKind::Message { sender: nickname.to_owned(), text: text.to_owned() };
        self.state().broadcast(room, &kind, None);
    }

    /// Push an arbitrary event to a connected client.
    ///
    /// Used to deliver late or duplicate events on stale subscriptions.
    pub fn inject(&self, identity: &str, event: TransportEvent) {
        if let Some(client) = self.state().clients.get(identity) {
            client.deliver(event);
        }
    }

    /// Identities present in `room`, in arrival order.
    pub fn present(&self, room: &str) -> Vec<String> {
        self.state().present.get(room).cloned().unwrap_or_default()
    }

    /// Subscription `identity` currently holds on `room`.
    pub fn subscription(&self, identity: &str, room: &str) -> Option<SubscriptionId> {
        self.state().clients.get(identity)?.subscriptions.get(room).copied()
    }

    /// Check whether `identity` is connected.
    pub fn is_connected(&self, identity: &str) -> bool {
        self.state().clients.contains_key(identity)
    }

    pub(crate) fn is_offline(&self) -> bool {
        self.state().offline
    }

    pub(crate) fn connect(
        &self,
        identity: &str,
        credential: Option<&str>,
        outbox: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), String> {
        let mut state = self.state();
        if let Some(reason) = state.refuse_connect.take() {
            return Err(reason);
        }
        match (state.accounts.get(identity), credential) {
            (Some(expected), Some(given)) if expected == given => {},
            (Some(_), _) => return Err("invalid credentials".to_owned()),
            (None, Some(_)) => return Err("unknown account".to_owned()),
            (None, None) => {},
        }
        if state.clients.contains_key(identity) {
            return Err(format!("nickname {identity} is already in use"));
        }

        state
            .clients
            .insert(identity.to_owned(), ClientEntry { outbox, subscriptions: HashMap::new() });
        tracing::debug!(identity, "client connected");
        Ok(())
    }

    pub(crate) fn fetch_rooms(&self, identity: &str) {
        let mut state = self.state();
        let event = match state.fail_catalog.take() {
            Some(reason) => TransportEvent::CatalogFailed { reason },
            None => TransportEvent::CatalogLoaded(state.catalog.clone()),
        };
        if let Some(client) = state.clients.get(identity) {
            client.deliver(event);
        }
    }

    pub(crate) fn join(&self, identity: &str, room: &str, subscription: SubscriptionId) {
        let mut state = self.state();
        let refusal = if state.catalog.iter().all(|r| r.name != room) {
            Some("no such room".to_owned())
        } else {
            state.rejected.get(room).cloned()
        };

        let Some(client) = state.clients.get_mut(identity) else {
            return;
        };
        if let Some(reason) = refusal {
            client.deliver(TransportEvent::JoinFailed {
                room: room.to_owned(),
                subscription,
                reason,
            });
            return;
        }
        client.subscriptions.insert(room.to_owned(), subscription);

        if state.hold_joins {
            state.held.push(HeldJoin {
                identity: identity.to_owned(),
                room: room.to_owned(),
                subscription,
            });
        } else {
            state.complete_join(identity, room, subscription);
        }
    }

    pub(crate) fn leave(&self, identity: &str, room: &str, subscription: SubscriptionId) {
        let mut state = self.state();
        let current = state.clients.get(identity).and_then(|c| c.subscriptions.get(room)).copied();
        if current == Some(subscription) {
            state.leave(identity, room);
        }
    }

    pub(crate) fn send(&self, identity: &str, room: &str, subscription: SubscriptionId, text: &str) {
        let state = self.state();
        let current = state.clients.get(identity).and_then(|c| c.subscriptions.get(room)).copied();
        if current != Some(subscription) {
            tracing::warn!(identity, room, %subscription, "message on unknown subscription dropped");
            return;
        }
        let kind = RoomEventKind::Message { sender: identity.to_owned(), text: text.to_owned() };
        state.broadcast(room, &kind, None);
    }

    pub(crate) fn logout(&self, identity: &str) {
        let mut state = self.state();
        let rooms: Vec<String> = state
            .clients
            .get(identity)
            .map(|c| c.subscriptions.keys().cloned().collect())
            .unwrap_or_default();
        for room in rooms {
            state.leave(identity, &room);
        }
        state.clients.remove(identity);
        tracing::debug!(identity, "client disconnected");
    }
}
