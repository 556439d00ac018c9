use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Quacker: command-line client for the duck network.
#[derive(Parser, Debug)]
#[command(name = "quacker", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Duck network URL, overriding `[realtime] url` from the config file.
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print every received message as one JSON line until Ctrl-C.
    Listen {
        /// Only print messages of this type (repeatable). Defaults to all.
        #[arg(long = "kind")]
        kinds: Vec<String>,
    },
    /// Send a quack.
    Quack {
        #[arg(long, allow_negative_numbers = true)]
        intensity: f64,
        #[arg(long)]
        dimension: String,
    },
    /// Report a mole sighting at the given coordinates.
    Mole {
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
    },
    /// Send the emergency Quacken release signal.
    Quacken,
}

pub fn parse() -> Args {
    Args::parse()
}
