//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{drain, enqueue, list, remove, status, watch};

/// Inspect and replay the domsync offline write queue.
#[derive(Parser, Debug)]
#[command(name = "domsync")]
#[command(author, version = env!("DOMSYNC_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Queue directory (defaults to the platform data directory)
    #[arg(long, env = "DOMSYNC_QUEUE_DIR", global = true)]
    pub queue_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Queue a write for later replay
    Enqueue(enqueue::EnqueueArgs),

    /// List queued operations, oldest first
    List(list::ListArgs),

    /// Delete a queued operation
    Remove(remove::RemoveArgs),

    /// Replay the queue against the remote store once
    Drain(drain::DrainArgs),

    /// Show queue and connectivity status
    Status(status::StatusArgs),

    /// Follow a network status file and replay whenever it reports online
    Watch(watch::WatchArgs),
}
