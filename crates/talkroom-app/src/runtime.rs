//! Generic runtime for session orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`Session`]: room session state machine
//! - [`Transport`]: requests out, responses and room events in
//! - [`DisplaySink`]: rendering
//!
//! Everything that reaches the session goes through one task, so commands,
//! transport events and ticks are applied strictly one at a time.

use std::{collections::VecDeque, time::Duration};

use talkroom_core::{
    DisplayCommand, Environment, Session, SessionAction, SessionConfig, SessionError,
    SessionEvent,
};
use tokio::{
    sync::mpsc,
    time::{self, MissedTickBehavior},
};

use crate::{Command, DisplaySink, Transport, TransportEvent, transport::failure_event};

/// Default interval between timeout ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Generic runtime that orchestrates Session, Transport and `DisplaySink`.
///
/// # Type Parameters
///
/// - `T`: Transport implementation
/// - `S`: Display sink
/// - `E`: Environment supplying time to the session
pub struct Runtime<T, S, E>
where
    T: Transport,
    S: DisplaySink,
    E: Environment,
{
    transport: T,
    sink: S,
    session: Session<E>,
    tick_interval: Duration,
}

impl<T, S, E> Runtime<T, S, E>
where
    T: Transport,
    S: DisplaySink,
    E: Environment,
{
    /// Create a runtime around a fresh, disconnected session.
    pub fn new(transport: T, sink: S, env: E, config: SessionConfig) -> Self {
        Self {
            transport,
            sink,
            session: Session::new(env, config),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Set the interval between timeout ticks.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Run the main event loop until [`Command::Quit`], the command channel
    /// closes, or the transport closes.
    ///
    /// The session is logged out before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the display sink fails.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<(), S::Error> {
        let config = self.session.config();
        tracing::info!(mode = ?config.tracking_mode, join_timeout = ?config.join_timeout, "runtime started");

        let mut ticker = time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        tracing::debug!("command channel closed");
                        break;
                    };
                    if self.apply(command).await? {
                        return Ok(());
                    }
                },
                event = self.transport.next_event() => {
                    let Some(event) = event else {
                        tracing::warn!("transport closed");
                        break;
                    };
                    self.process_event(event).await?;
                    self.drain().await?;
                },
                _ = ticker.tick() => self.tick().await?,
            }
        }

        let actions = self.session.logout();
        self.execute(actions).await
    }

    /// Apply a user command.
    ///
    /// Command errors are rendered as system messages, except dropped sends
    /// which are ignored. Returns `true` if the runtime should stop.
    ///
    /// # Errors
    ///
    /// Returns an error if the display sink fails.
    pub async fn apply(&mut self, command: Command) -> Result<bool, S::Error> {
        tracing::debug!(?command, "applying command");
        let result = match command {
            Command::Login { identity, credential } => {
                self.session.connect(&identity, credential.as_deref())
            },
            Command::SwitchRoom(room) => self.session.switch_room(&room),
            Command::LeaveRoom => Ok(self.session.leave_active()),
            Command::Send(text) => self.session.send_active_message(&text),
            Command::RefreshRooms => self.session.refresh_catalog(),
            Command::Logout => Ok(self.session.logout()),
            Command::Quit => {
                let actions = self.session.logout();
                self.execute(actions).await?;
                return Ok(true);
            },
        };

        match result {
            Ok(actions) => self.execute(actions).await?,
            Err(err) => self.report(&err)?,
        }
        Ok(false)
    }

    /// Feed one transport event to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the display sink fails.
    pub async fn process_event(&mut self, event: TransportEvent) -> Result<(), S::Error> {
        let actions = self.session.handle(event.into());
        self.execute(actions).await
    }

    /// Expire overdue acknowledgments at the environment's current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the display sink fails.
    pub async fn tick(&mut self) -> Result<(), S::Error> {
        let now = self.session.env().now();
        let actions = self.session.handle(SessionEvent::Tick { now });
        self.execute(actions).await
    }

    /// Process every transport event that is ready without waiting.
    ///
    /// Returns the number of events processed.
    ///
    /// # Errors
    ///
    /// Returns an error if the display sink fails.
    pub async fn drain(&mut self) -> Result<usize, S::Error> {
        let mut processed = 0;
        while self.step().await? {
            processed += 1;
        }
        Ok(processed)
    }

    /// Process one ready transport event, if any.
    ///
    /// Returns `true` if an event was processed.
    ///
    /// # Errors
    ///
    /// Returns an error if the display sink fails.
    pub async fn step(&mut self) -> Result<bool, S::Error> {
        let Some(event) = self.transport.try_next_event() else {
            return Ok(false);
        };
        self.process_event(event).await?;
        Ok(true)
    }

    /// Execute session actions in order.
    ///
    /// A transport request that cannot be sent is turned into the matching
    /// failure event, whose actions run after the remaining ones.
    async fn execute(&mut self, actions: Vec<SessionAction>) -> Result<(), S::Error> {
        let mut pending: VecDeque<SessionAction> = actions.into();

        while let Some(action) = pending.pop_front() {
            match action {
                SessionAction::Display(command) => self.sink.render(command)?,
                SessionAction::Transport(command) => {
                    if let Err(err) = self.transport.execute(command.clone()).await
                        && let Some(event) = failure_event(command, err.to_string())
                    {
                        pending.extend(self.session.handle(event));
                    }
                },
            }
        }
        Ok(())
    }

    fn report(&mut self, err: &SessionError) -> Result<(), S::Error> {
        if err.is_silent() {
            tracing::trace!(%err, "command ignored");
            return Ok(());
        }
        if err.is_transient() {
            tracing::warn!(%err, "command failed");
        } else {
            tracing::debug!(%err, "command rejected");
        }
        self.sink.render(DisplayCommand::SystemMessage { text: err.to_string() })
    }

    /// Get a reference to the session
    pub fn session(&self) -> &Session<E> {
        &self.session
    }

    /// Get a reference to the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a reference to the display sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Get a mutable reference to the display sink
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
