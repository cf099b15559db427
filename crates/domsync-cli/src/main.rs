//! domsync - CLI for the offline write queue.
//!
//! This is a thin wrapper over `domsync-core` and its file and REST
//! backends, intended for operators inspecting a device's queue and for
//! scripting replays.

mod cli;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use commands::{drain, enqueue, list, remove, status, watch};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.json_logs);

    let queue_dir = config::queue_dir(cli.queue_dir.as_deref())?;

    match cli.command {
        Commands::Enqueue(args) => enqueue::run(args, &queue_dir).await,
        Commands::List(args) => list::run(args, &queue_dir).await,
        Commands::Remove(args) => remove::run(args, &queue_dir).await,
        Commands::Drain(args) => drain::run(args, &queue_dir).await,
        Commands::Status(args) => status::run(args, &queue_dir).await,
        Commands::Watch(args) => watch::run(args, &queue_dir).await,
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr; stdout carries command output.
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
