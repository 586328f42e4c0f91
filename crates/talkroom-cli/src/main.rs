//! Talkroom terminal client entry point.
//!
//! # Usage
//!
//! ```bash
//! # Default rooms, eager tracking
//! talkroom --name alice
//!
//! # Custom rooms and lazy tracking
//! talkroom --config talkroom.json --tracking lazy
//! ```

use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use talkroom_app::{Command, Runtime};
use talkroom_cli::{CliConfig, CliError, ConsoleSink};
use talkroom_core::{SystemEnv, TrackingMode};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Room tracking policy.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Tracking {
    /// Subscribe to every listed room at login
    Eager,
    /// Subscribe only to the room being entered
    Lazy,
}

impl From<Tracking> for TrackingMode {
    fn from(tracking: Tracking) -> Self {
        match tracking {
            Tracking::Eager => Self::Eager,
            Tracking::Lazy => Self::Lazy,
        }
    }
}

/// Talkroom terminal client
#[derive(Parser, Debug)]
#[command(name = "talkroom")]
#[command(about = "Multi-room chat client with background presence tracking")]
#[command(version)]
struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Room tracking policy (overrides the config file)
    #[arg(long, value_enum)]
    tracking: Option<Tracking>,

    /// Join acknowledgment timeout in milliseconds (overrides the config file)
    #[arg(long)]
    join_timeout_ms: Option<u64>,

    /// Log in with this name on startup
    #[arg(short, long)]
    name: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let mut config = match &args.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    if let Some(tracking) = args.tracking {
        config.session = config.session.with_tracking_mode(tracking.into());
    }
    if let Some(ms) = args.join_timeout_ms {
        config.session = config.session.with_join_timeout(Duration::from_millis(ms));
    }
    tracing::info!(?config.session, rooms = config.rooms.len(), "starting client");

    let server = config.loopback_server();
    let (commands, inbox) = mpsc::channel(32);
    if let Some(identity) = args.name
        && commands.send(Command::Login { identity, credential: None }).await.is_err()
    {
        return Ok(());
    }
    tokio::spawn(read_commands(commands));

    let sink = ConsoleSink::new(std::io::stdout());
    let runtime = Runtime::new(server.transport(), sink, SystemEnv::new(), config.session);
    runtime.run(inbox).await?;
    Ok(())
}

/// Parse stdin lines into commands until EOF or `/quit`.
async fn read_commands(commands: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::error!(%err, "cannot read stdin");
                break;
            },
        };

        match Command::parse(&line) {
            Ok(command) => {
                let quit = command == Command::Quit;
                if commands.send(command).await.is_err() || quit {
                    break;
                }
            },
            Err(err) => tracing::warn!(%err, line = %line, "input not understood"),
        }
    }
}
