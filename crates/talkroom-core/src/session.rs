//! Session controller.
//!
//! The [`Session`] is the top-level state machine of the room session core.
//! It owns the connection state, the current user, the room catalog, the
//! active-room pointer and the [`SubscriptionManager`], and it runs the
//! switch-room protocol.
//!
//! This is a pure state machine: user commands are methods returning
//! [`SessionAction`]s, transport responses enter through [`Session::handle`].
//!
//! # Switch protocol
//!
//! ```text
//! switch_room(B)
//!   ├─ active A?     → "You have left A"
//!   ├─ B live?       → "You have joined B" + roster snapshot   (done)
//!   └─ B not live    → Join(B), switch in flight
//!                         ├─ SelfJoined(B) → "You have joined B" + roster
//!                         └─ JoinFailed(B) → "Failed to join B", no room
//! ```
//!
//! While a switch is in flight the active room is unset, so it can never name
//! an untracked room. Further switch requests are queued and started once the
//! in-flight switch resolves.

use std::collections::VecDeque;

use crate::{
    Catalog, ConnectionState, DisplayCommand, Environment, RoomDescriptor, RoomEvent,
    SessionAction, SessionConfig, SessionError, SessionEvent, SubscriptionId, TrackingMode,
    TransportCommand,
    dispatcher::{DispatchContext, EventDispatcher},
    roster::Roster,
    subscription::{SubscriptionManager, TrackOutcome},
};

/// Identity waiting for the connect acknowledgment.
#[derive(Debug, Clone)]
struct PendingLogin {
    identity: String,
    registered: bool,
}

/// Room session state machine.
///
/// Generic over [`Environment`] so timeouts and message timestamps run on a
/// virtual clock in simulation.
#[derive(Debug, Clone)]
pub struct Session<E: Environment> {
    env: E,
    config: SessionConfig,
    /// Connection state.
    state: ConnectionState,
    /// Login in progress. `Some` only while connecting.
    pending_login: Option<PendingLogin>,
    /// Local identity. `Some` only while connected.
    current_user: Option<String>,
    /// Rooms available to join.
    catalog: Catalog,
    /// Room currently displayed. Always a live subscription when set.
    active_room: Option<String>,
    /// Room subscriptions and their rosters.
    subscriptions: SubscriptionManager<E::Instant>,
    dispatcher: EventDispatcher,
    /// Target of the switch waiting for its join acknowledgment.
    switching: Option<String>,
    /// Switch requests received while a switch was in flight.
    switch_queue: VecDeque<String>,
    connect_requested_at: Option<E::Instant>,
    catalog_requested_at: Option<E::Instant>,
}

impl<E: Environment> Session<E> {
    /// Create a disconnected session.
    pub fn new(env: E, config: SessionConfig) -> Self {
        let subscriptions = SubscriptionManager::new(config.tracking_mode);
        Self {
            env,
            config,
            state: ConnectionState::Disconnected,
            pending_login: None,
            current_user: None,
            catalog: Catalog::default(),
            active_room: None,
            subscriptions,
            dispatcher: EventDispatcher,
            switching: None,
            switch_queue: VecDeque::new(),
            connect_requested_at: None,
            catalog_requested_at: None,
        }
    }

    /// Start connecting as `identity`.
    ///
    /// An empty credential is treated as anonymous use.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidIdentity`] if `identity` is blank. No
    ///   transport request is made.
    /// - [`SessionError::InvalidState`] unless disconnected.
    pub fn connect(
        &mut self,
        identity: &str,
        credential: Option<&str>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if identity.trim().is_empty() {
            return Err(SessionError::InvalidIdentity);
        }
        if self.state != ConnectionState::Disconnected {
            return Err(SessionError::InvalidState { state: self.state, operation: "connect" });
        }

        let credential = credential.filter(|c| !c.is_empty());
        self.state = ConnectionState::Connecting;
        self.pending_login =
            Some(PendingLogin { identity: identity.to_owned(), registered: credential.is_some() });
        self.connect_requested_at = Some(self.env.now());

        tracing::info!(identity, registered = credential.is_some(), "connecting");
        Ok(vec![
            TransportCommand::Connect {
                identity: identity.to_owned(),
                credential: credential.map(str::to_owned),
            }
            .into(),
        ])
    }

    /// Tear the session down. No-op when already disconnected.
    ///
    /// Leaves every subscription (pending or live), discards queued switches,
    /// and clears the current user, active room and catalog. Acknowledgments
    /// and events that arrive afterwards for the torn-down subscriptions are
    /// discarded.
    pub fn logout(&mut self) -> Vec<SessionAction> {
        if self.state == ConnectionState::Disconnected {
            return Vec::new();
        }

        let mut actions: Vec<SessionAction> =
            self.subscriptions.teardown().into_iter().map(SessionAction::from).collect();
        actions.push(TransportCommand::Logout.into());

        tracing::info!(user = ?self.current_user, from = ?self.state, "logged out");
        self.reset();

        actions.extend([
            SessionAction::system("Disconnected."),
            DisplayCommand::ClearRoom.into(),
            DisplayCommand::InputEnabled(false).into(),
            DisplayCommand::LeaveVisible(false).into(),
            DisplayCommand::Catalog { rooms: Vec::new() }.into(),
        ]);
        actions
    }

    /// Make `room` the active room.
    ///
    /// Leaves the current active room first. If `room` is not yet tracked it
    /// is joined and the switch completes when the join is acknowledged. A
    /// request made while another switch is in flight is queued.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`] unless connected.
    /// - [`SessionError::UnknownRoom`] if `room` is not in the catalog.
    pub fn switch_room(&mut self, room: &str) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != ConnectionState::Connected {
            return Err(SessionError::InvalidState { state: self.state, operation: "switch room" });
        }
        if !self.catalog.contains(room) {
            return Err(SessionError::UnknownRoom { room: room.to_owned() });
        }

        if let Some(in_flight) = &self.switching {
            tracing::debug!(room, in_flight = %in_flight, "switch queued");
            self.switch_queue.push_back(room.to_owned());
            return Ok(Vec::new());
        }

        let mut actions = self.begin_switch(room.to_owned());
        actions.extend(self.drain_switch_queue());
        Ok(actions)
    }

    /// Clear the active room. No-op if no room is active and no switch is in
    /// flight.
    ///
    /// In eager mode the room stays tracked so its roster and badge stay
    /// live. In lazy mode its subscription is dropped.
    ///
    /// During a switch there is no active room yet; the in-flight switch and
    /// every queued switch are cancelled instead, so a late acknowledgment
    /// does not make the room active.
    pub fn leave_active(&mut self) -> Vec<SessionAction> {
        let mut actions = self.cancel_switch();
        actions.extend(self.leave_active_room());
        actions
    }

    /// Send `text` to the active room.
    ///
    /// # Errors
    ///
    /// - [`SessionError::SendIgnored`] if the trimmed text is empty or no room
    ///   is active.
    pub fn send_active_message(&self, text: &str) -> Result<Vec<SessionAction>, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::SendIgnored { reason: "empty message" });
        }
        let Some(room) = self.active_room.as_deref() else {
            return Err(SessionError::SendIgnored { reason: "no active room" });
        };
        let Some(subscription) = self.subscriptions.get(room) else {
            return Err(SessionError::SendIgnored { reason: "active room has no subscription" });
        };

        Ok(vec![
            TransportCommand::Send {
                room: room.to_owned(),
                subscription: subscription.id,
                text: text.to_owned(),
            }
            .into(),
        ])
    }

    /// Fetch the catalog again. No-op if a fetch is already outstanding.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`] unless connected.
    pub fn refresh_catalog(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != ConnectionState::Connected {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation: "refresh rooms",
            });
        }
        if self.catalog_requested_at.is_some() {
            return Ok(Vec::new());
        }
        self.catalog_requested_at = Some(self.env.now());
        Ok(vec![TransportCommand::FetchRooms.into()])
    }

    /// Process a transport response or tick and return actions.
    pub fn handle(&mut self, event: SessionEvent<E::Instant>) -> Vec<SessionAction> {
        match event {
            SessionEvent::Connected => self.handle_connected(),
            SessionEvent::ConnectFailed { reason } => self.handle_connect_failed(reason),
            SessionEvent::CatalogLoaded(rooms) => self.handle_catalog_loaded(rooms),
            SessionEvent::CatalogFailed { reason } => self.handle_catalog_failed(&reason),
            SessionEvent::JoinFailed { room, subscription, reason } => {
                self.handle_join_failed(room, subscription, reason)
            },
            SessionEvent::Room(event) => self.handle_room_event(event),
            SessionEvent::Tick { now } => self.handle_tick(now),
        }
    }

    fn handle_connected(&mut self) -> Vec<SessionAction> {
        if self.state != ConnectionState::Connecting {
            tracing::warn!(state = ?self.state, "discarding late connect acknowledgment");
            return Vec::new();
        }
        let Some(login) = self.pending_login.take() else {
            tracing::warn!("connect acknowledged without a pending login");
            return Vec::new();
        };

        self.state = ConnectionState::Connected;
        self.connect_requested_at = None;
        self.catalog_requested_at = Some(self.env.now());

        let greeting = if login.registered {
            format!("Connected with registered account {}", login.identity)
        } else {
            format!("Connected anonymously as {}", login.identity)
        };
        tracing::info!(identity = %login.identity, "connected");
        self.current_user = Some(login.identity);

        vec![
            SessionAction::system(greeting),
            SessionAction::system("Connection established. Loading rooms..."),
            TransportCommand::FetchRooms.into(),
        ]
    }

    fn handle_connect_failed(&mut self, reason: String) -> Vec<SessionAction> {
        if self.state != ConnectionState::Connecting {
            tracing::warn!(state = ?self.state, %reason, "discarding late connect failure");
            return Vec::new();
        }

        tracing::warn!(%reason, "connect failed");
        self.state = ConnectionState::Disconnected;
        self.pending_login = None;
        self.connect_requested_at = None;

        vec![SessionAction::system(SessionError::ConnectionFailed { reason }.to_string())]
    }

    fn handle_catalog_loaded(&mut self, listing: Vec<RoomDescriptor>) -> Vec<SessionAction> {
        if self.state != ConnectionState::Connected || self.catalog_requested_at.is_none() {
            tracing::warn!(state = ?self.state, "discarding unrequested catalog");
            return Vec::new();
        }
        self.catalog_requested_at = None;
        self.catalog = Catalog::new(listing);
        tracing::debug!(rooms = self.catalog.len(), "catalog loaded");

        let mut actions: Vec<SessionAction> =
            vec![DisplayCommand::Catalog { rooms: self.catalog.rooms().to_vec() }.into()];

        // Rooms that vanished from the listing lose their subscription unless
        // the user is in them or on the way in.
        let mut subscribed = self.subscriptions.tracked_rooms();
        subscribed.extend(self.subscriptions.pending_rooms());
        for room in subscribed {
            let keep = self.catalog.contains(&room)
                || self.active_room.as_deref() == Some(room.as_str())
                || self.switching.as_deref() == Some(room.as_str());
            if !keep && let Some(leave) = self.subscriptions.untrack(&room) {
                actions.push(leave.into());
            }
        }

        if self.catalog.is_empty() {
            let err = SessionError::CatalogUnavailable { reason: String::new() };
            actions.push(SessionAction::system(err.to_string()));
            return actions;
        }

        actions.push(SessionAction::system("Rooms loaded. Please select a room to join."));
        if self.subscriptions.mode() == TrackingMode::Eager {
            let now = self.env.now();
            let joins = self.subscriptions.track_all(self.catalog.names(), now);
            actions.extend(joins.into_iter().map(SessionAction::from));
        }
        actions
    }

    fn handle_catalog_failed(&mut self, reason: &str) -> Vec<SessionAction> {
        if self.state != ConnectionState::Connected || self.catalog_requested_at.is_none() {
            tracing::warn!(state = ?self.state, reason, "discarding unrequested catalog failure");
            return Vec::new();
        }
        tracing::warn!(reason, "catalog fetch failed");
        self.catalog_requested_at = None;

        let err = SessionError::CatalogUnavailable { reason: reason.to_owned() };
        vec![SessionAction::system(err.to_string())]
    }

    fn handle_join_failed(
        &mut self,
        room: String,
        subscription: SubscriptionId,
        reason: String,
    ) -> Vec<SessionAction> {
        if !self.subscriptions.reject(&room, subscription) {
            tracing::warn!(room = %room, %subscription, "discarding join failure for detached subscription");
            return Vec::new();
        }
        tracing::warn!(room = %room, %reason, "join failed");
        self.fail_join(room, reason)
    }

    fn handle_room_event(&mut self, event: RoomEvent) -> Vec<SessionAction> {
        let room = event.room.clone();
        let ctx = DispatchContext {
            current_user: self.current_user.as_deref(),
            active_room: self.active_room.as_deref(),
            received_at: self.env.wall_clock(),
        };
        let dispatch = self.dispatcher.dispatch(&mut self.subscriptions, &ctx, event);

        let mut actions = dispatch.actions;
        if dispatch.acknowledged && self.switching.as_deref() == Some(room.as_str()) {
            actions.extend(self.complete_switch(room));
            actions.extend(self.drain_switch_queue());
        }
        actions
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if let Some(requested_at) = self.connect_requested_at
            && now - requested_at >= self.config.connect_timeout
        {
            let reason = SessionError::timed_out("connect", now - requested_at);
            actions.push(TransportCommand::Logout.into());
            actions.extend(self.handle_connect_failed(reason));
        }

        if let Some(requested_at) = self.catalog_requested_at
            && now - requested_at >= self.config.catalog_timeout
        {
            let reason = SessionError::timed_out("room listing", now - requested_at);
            actions.extend(self.handle_catalog_failed(&reason));
        }

        for (room, subscription) in self.subscriptions.expired(now, self.config.join_timeout) {
            tracing::warn!(room = %room, %subscription, "join acknowledgment timed out");
            if let Some(leave) = self.subscriptions.untrack(&room) {
                actions.push(leave.into());
            }
            let reason = SessionError::timed_out("join", self.config.join_timeout);
            actions.extend(self.fail_join(room, reason));
        }

        actions
    }

    /// Report a failed join and release the switch waiting on it.
    fn fail_join(&mut self, room: String, reason: String) -> Vec<SessionAction> {
        let released = self.switching.as_deref() == Some(room.as_str());
        let mut actions =
            vec![SessionAction::system(SessionError::JoinFailed { room, reason }.to_string())];
        if released {
            self.switching = None;
            actions.extend(self.drain_switch_queue());
        }
        actions
    }

    /// Leave the active room and start tracking `room`.
    ///
    /// Completes immediately when `room` is already live; otherwise records
    /// the switch as in flight.
    fn begin_switch(&mut self, room: String) -> Vec<SessionAction> {
        let mut actions = self.leave_active_room();

        let now = self.env.now();
        match self.subscriptions.track(&room, now) {
            TrackOutcome::Live(_) => actions.extend(self.complete_switch(room)),
            outcome => {
                tracing::debug!(room = %room, "switch waiting for join acknowledgment");
                self.switching = Some(room);
                if let Some(join) = outcome.into_command() {
                    actions.push(join.into());
                }
            },
        }
        actions
    }

    /// Make a live room active and render it.
    fn complete_switch(&mut self, room: String) -> Vec<SessionAction> {
        self.switching = None;
        if let Some(activity) = self.subscriptions.activity_mut(&room) {
            activity.unread = 0;
        }
        let members = self.subscriptions.rosters().snapshot(&room);
        tracing::info!(room = %room, members = members.len(), "active room switched");
        self.active_room = Some(room.clone());

        vec![
            SessionAction::system(format!("You have joined {room}")),
            DisplayCommand::Roster { room: room.clone(), members, change: None }.into(),
            DisplayCommand::RoomBadge { room, unread: 0 }.into(),
            DisplayCommand::InputEnabled(true).into(),
            DisplayCommand::LeaveVisible(true).into(),
        ]
    }

    /// Start queued switches until one has to wait for an acknowledgment.
    fn drain_switch_queue(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        while self.switching.is_none() {
            let Some(room) = self.switch_queue.pop_front() else {
                break;
            };
            if self.state != ConnectionState::Connected || !self.catalog.contains(&room) {
                tracing::warn!(room = %room, "dropping queued switch to unavailable room");
                continue;
            }
            actions.extend(self.begin_switch(room));
        }
        actions
    }

    /// Abandon the in-flight switch and the queue behind it.
    fn cancel_switch(&mut self) -> Vec<SessionAction> {
        let Some(room) = self.switching.take() else {
            return Vec::new();
        };
        let dropped = self.switch_queue.len();
        self.switch_queue.clear();
        tracing::info!(room = %room, dropped, "switch cancelled");

        let mut actions = vec![SessionAction::system(format!("Stopped joining {room}"))];
        if self.subscriptions.mode() == TrackingMode::Lazy
            && let Some(leave) = self.subscriptions.untrack(&room)
        {
            actions.push(leave.into());
        }
        actions
    }

    fn leave_active_room(&mut self) -> Vec<SessionAction> {
        let Some(room) = self.active_room.take() else {
            return Vec::new();
        };
        tracing::info!(room = %room, "left active room");

        let mut actions = vec![
            SessionAction::system(format!("You have left {room}")),
            DisplayCommand::ClearRoom.into(),
            DisplayCommand::InputEnabled(false).into(),
            DisplayCommand::LeaveVisible(false).into(),
        ];
        if self.subscriptions.mode() == TrackingMode::Lazy
            && let Some(leave) = self.subscriptions.untrack(&room)
        {
            actions.push(leave.into());
        }
        actions
    }

    fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.pending_login = None;
        self.current_user = None;
        self.catalog = Catalog::default();
        self.active_room = None;
        self.switching = None;
        self.switch_queue.clear();
        self.connect_requested_at = None;
        self.catalog_requested_at = None;
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    /// Local identity. `None` unless connected.
    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    /// Room currently displayed. `None` if no room is active.
    pub fn active_room(&self) -> Option<&str> {
        self.active_room.as_deref()
    }

    /// Target of the switch waiting for its join acknowledgment.
    pub fn switch_in_flight(&self) -> Option<&str> {
        self.switching.as_deref()
    }

    /// Switch requests waiting behind the in-flight switch, oldest first.
    pub fn queued_switches(&self) -> impl Iterator<Item = &str> {
        self.switch_queue.iter().map(String::as_str)
    }

    /// Rooms available to join.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Tracked room names, sorted.
    pub fn tracked_rooms(&self) -> Vec<String> {
        self.subscriptions.tracked_rooms()
    }

    /// Roster of a subscribed room. `None` if the room has no subscription.
    pub fn roster(&self, room: &str) -> Option<&Roster> {
        self.subscriptions.roster(room)
    }

    /// Messages observed in `room` while it was not active.
    pub fn unread(&self, room: &str) -> u64 {
        self.subscriptions.get(room).map_or(0, |s| s.activity.unread)
    }

    /// Subscription manager (read-only).
    pub fn subscriptions(&self) -> &SubscriptionManager<E::Instant> {
        &self.subscriptions
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Environment the session reads time from.
    pub fn env(&self) -> &E {
        &self.env
    }
}
