//! Simulated transport implementing [`Transport`].
//!
//! Connects a [`talkroom_app::Runtime`] to a [`SimServer`] so the same
//! orchestration code runs in production and simulation.

use talkroom_app::{Transport, TransportEvent};
use talkroom_core::TransportCommand;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::SimServer;

/// Error type for the simulated transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimTransportError {
    /// The server was set offline.
    #[error("server unreachable")]
    Offline,
}

/// One client connection to a [`SimServer`].
pub struct SimTransport {
    server: SimServer,
    identity: Option<String>,
    outbox: mpsc::UnboundedSender<TransportEvent>,
    inbox: mpsc::UnboundedReceiver<TransportEvent>,
    sent: Vec<TransportCommand>,
}

impl SimTransport {
    pub(crate) fn new(server: SimServer) -> Self {
        let (outbox, inbox) = mpsc::unbounded_channel();
        Self { server, identity: None, outbox, inbox, sent: Vec::new() }
    }

    /// Every request handed to this transport, in order.
    pub fn sent(&self) -> &[TransportCommand] {
        &self.sent
    }

    /// Identity this connection authenticated as.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    fn deliver(&self, event: TransportEvent) {
        if self.outbox.send(event).is_err() {
            tracing::trace!("transport inbox closed");
        }
    }

    fn dispatch(&mut self, command: TransportCommand) {
        if let TransportCommand::Connect { identity, credential } = command {
            match self.server.connect(&identity, credential.as_deref(), self.outbox.clone()) {
                Ok(()) => {
                    self.identity = Some(identity);
                    self.deliver(TransportEvent::Connected);
                },
                Err(reason) => self.deliver(TransportEvent::ConnectFailed { reason }),
            }
            return;
        }

        let Some(identity) = self.identity.clone() else {
            tracing::warn!(?command, "request before connect ignored");
            return;
        };
        match command {
            TransportCommand::Connect { .. } => {},
            TransportCommand::FetchRooms => self.server.fetch_rooms(&identity),
            TransportCommand::Join { room, subscription } => {
                self.server.join(&identity, &room, subscription);
            },
            TransportCommand::Leave { room, subscription } => {
                self.server.leave(&identity, &room, subscription);
            },
            TransportCommand::Send { room, subscription, text } => {
                self.server.send(&identity, &room, subscription, &text);
            },
            TransportCommand::Logout => {
                self.server.logout(&identity);
                self.identity = None;
            },
        }
    }
}

impl Transport for SimTransport {
    type Error = SimTransportError;

    async fn execute(&mut self, command: TransportCommand) -> Result<(), Self::Error> {
        self.sent.push(command.clone());
        if self.server.is_offline() {
            return Err(SimTransportError::Offline);
        }
        self.dispatch(command);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.inbox.recv().await
    }

    fn try_next_event(&mut self) -> Option<TransportEvent> {
        self.inbox.try_recv().ok()
    }
}
