//! Scenario driver.
//!
//! Wires a [`Runtime`] to a [`SimServer`], a [`RecordingSink`] and a
//! [`SimEnv`], and checks the standard invariants after every command, event
//! and tick.

use std::time::Duration;

use talkroom_app::{Command, Runtime, TransportEvent};
use talkroom_core::{Session, SessionConfig};

use crate::{
    InvariantRegistry, RecordingSink, SessionSnapshot, SimEnv, SimServer, SimTransport,
};

/// Runtime type used by simulation scenarios.
pub type SimRuntime = Runtime<SimTransport, RecordingSink, SimEnv>;

/// One simulated client driven step by step.
pub struct Scenario {
    env: SimEnv,
    runtime: SimRuntime,
    invariants: InvariantRegistry,
}

impl Scenario {
    /// Open a client connection to `server`.
    pub fn new(server: &SimServer, config: SessionConfig) -> Self {
        let env = SimEnv::new();
        let runtime = Runtime::new(server.transport(), RecordingSink::new(), env.clone(), config);
        Self { env, runtime, invariants: InvariantRegistry::standard() }
    }

    /// Apply a command, then deliver every resulting event.
    ///
    /// Returns `true` if the command asked the runtime to stop.
    pub async fn command(&mut self, command: Command) -> bool {
        let Ok(quit) = self.runtime.apply(command).await;
        self.check("after command");
        self.settle().await;
        quit
    }

    /// Parse and apply an input line.
    ///
    /// Returns `false` if the line did not parse.
    pub async fn input(&mut self, line: &str) -> bool {
        match Command::parse(line) {
            Ok(command) => {
                self.command(command).await;
                true
            },
            Err(err) => {
                tracing::debug!(%err, line, "unparsable input");
                false
            },
        }
    }

    /// Log in and deliver the connect, catalog and join responses.
    pub async fn login(&mut self, identity: &str) {
        self.command(Command::Login { identity: identity.to_owned(), credential: None }).await;
    }

    /// Deliver pending events one at a time until none are left.
    pub async fn settle(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            let Ok(stepped) = self.runtime.step().await;
            if !stepped {
                return delivered;
            }
            delivered += 1;
            self.check("after event");
        }
    }

    /// Deliver one event as if it had just arrived from the transport.
    ///
    /// Used for events the server would no longer route, such as an
    /// acknowledgment already in flight when the client logged out.
    pub async fn deliver(&mut self, event: TransportEvent) {
        let Ok(()) = self.runtime.process_event(event).await;
        self.check("after delivered event");
        self.settle().await;
    }

    /// Advance virtual time, run a tick, and deliver the results.
    pub async fn advance(&mut self, by: Duration) {
        self.env.advance(by);
        let Ok(()) = self.runtime.tick().await;
        self.check("after tick");
        self.settle().await;
    }

    /// Assert every standard invariant against the current session state.
    pub fn check(&self, context: &str) {
        self.invariants.assert_all(&SessionSnapshot::from_session(self.session()), context);
    }

    /// The session under test.
    pub fn session(&self) -> &Session<SimEnv> {
        self.runtime.session()
    }

    /// The client's transport.
    pub fn transport(&self) -> &SimTransport {
        self.runtime.transport()
    }

    /// The recording display sink.
    pub fn sink(&self) -> &RecordingSink {
        self.runtime.sink()
    }

    /// Take the transcript rendered since the last call.
    pub fn take_transcript(&mut self) -> String {
        let sink = self.runtime.sink_mut();
        let transcript = sink.transcript();
        sink.take();
        transcript
    }
}
