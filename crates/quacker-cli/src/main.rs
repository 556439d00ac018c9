//! quacker: command-line client for the duck network.
//!
//! Loads the TOML config, opens one realtime connection and either streams
//! incoming messages to stdout or sends a single typed message.

mod cli;

use std::future::Future;
use std::process::ExitCode;

use quacker_common::{QuackerError, Result};
use quacker_config::{QuackerConfig, RealtimeSection};
use quacker_realtime::{Message, RealtimeChannelClient, RealtimeConfig, WILDCARD};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use crate::cli::{Args, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    // Logging is up before the config loads so the loader's own lines are
    // printed; the config's level is applied afterwards.
    let filter = init_logging(args.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL));

    let config = match quacker_config::load_config_from(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            return ExitCode::FAILURE;
        }
    };

    if args.log_level.is_none() {
        if let Err(e) = filter.reload(env_filter(config.logging.level.as_directive())) {
            tracing::warn!(error = %e, "Failed to apply configured log level");
        }
    }

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "quacker failed");
            ExitCode::FAILURE
        }
    }
}

const DEFAULT_LOG_LEVEL: &str = "info";

type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn init_logging(level: &str) -> FilterHandle {
    let (filter, handle) = reload::Layer::new(env_filter(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

/// `RUST_LOG` when set, else `level` for every quacker crate.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(level)))
}

fn directives(level: &str) -> String {
    ["quacker", "quacker_config", "quacker_realtime"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

async fn run(args: Args, config: QuackerConfig) -> Result<()> {
    let realtime = realtime_config(&config.realtime, args.url.as_deref());
    let client = RealtimeChannelClient::new(realtime);
    client
        .connect()
        .await
        .map_err(|e| QuackerError::Realtime(e.to_string()))?;

    let outcome = match args.command {
        Command::Listen { kinds } => listen_until(&client, kinds, tokio::signal::ctrl_c()).await,
        Command::Quack {
            intensity,
            dimension,
        } => require_sent(client.send_quack(intensity, &dimension), "quack"),
        Command::Mole { x, y } => require_sent(client.report_mole(x, y), "mole_sighting"),
        Command::Quacken => require_sent(client.release_the_quacken(), "release_quacken"),
    };

    client.close().await;
    outcome
}

/// Build the library config from the `[realtime]` section, with an optional
/// URL override from the command line.
fn realtime_config(section: &RealtimeSection, url: Option<&str>) -> RealtimeConfig {
    RealtimeConfig {
        url: url.map_or_else(|| section.url.clone(), str::to_string),
        heartbeat_interval_secs: u64::from(section.heartbeat_interval_secs),
        reconnect_base_delay_ms: u64::from(section.reconnect_base_delay_ms),
        max_reconnect_attempts: section.max_reconnect_attempts,
        connect_timeout_secs: u64::from(section.connect_timeout_secs),
    }
}

/// Print received messages until `stop` resolves. Fails if the client gives
/// up reconnecting first.
async fn listen_until(
    client: &RealtimeChannelClient,
    kinds: Vec<String>,
    stop: impl Future<Output = std::io::Result<()>>,
) -> Result<()> {
    let print = |message: &Message| match message.to_json() {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "Failed to encode received message"),
    };

    let _subscriptions: Vec<_> = if kinds.is_empty() {
        vec![client.subscribe(WILDCARD, print)]
    } else {
        kinds
            .into_iter()
            .map(|kind| client.subscribe(kind, print))
            .collect()
    };

    tracing::info!("Listening on the duck network; Ctrl-C to stop");
    tokio::select! {
        stopped = stop => Ok(stopped?),
        () = client.wait_until_offline() => Err(QuackerError::Realtime(
            "gave up reconnecting to the duck network".into(),
        )),
    }
}

fn require_sent(sent: bool, kind: &str) -> Result<()> {
    if sent {
        tracing::info!(kind, "Message sent");
        Ok(())
    } else {
        Err(QuackerError::Other(format!("{kind} was not sent: not connected")))
    }
}
