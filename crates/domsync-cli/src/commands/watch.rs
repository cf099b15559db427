//! Watch command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tokio::sync::broadcast::error::RecvError;

use domsync_core::OfflineSync;
use domsync_file::{FileQueue, FileSignal};

use crate::config::{CliRemote, RemoteArgs};
use crate::output;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Network status file containing "online" or "offline"
    #[arg(long)]
    pub signal_file: PathBuf,

    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Output events as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: WatchArgs, queue_dir: &Path) -> Result<()> {
    let remote = CliRemote::resolve(&args.remote)?;
    let signal = FileSignal::watch(&args.signal_file).with_context(|| {
        format!(
            "Failed to watch network status file {}",
            args.signal_file.display()
        )
    })?;

    eprintln!(
        "{}",
        format!(
            "Watching {} and replaying into {}",
            args.signal_file.display(),
            remote.describe()
        )
        .dimmed()
    );
    eprintln!("{}", "Press Ctrl+C to stop.".dimmed());
    eprintln!();

    let sync = OfflineSync::start(
        FileQueue::new(queue_dir),
        remote,
        signal,
        args.remote.sync_config(),
    );
    let mut events = sync.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) if args.json => output::json(&event)?,
                Ok(event) => output::event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    output::warning(&format!("Skipped {} events", skipped));
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let pending = sync.pending().await.map(|ops| ops.len()).unwrap_or(0);
    sync.shutdown();
    output::note(&format!("Stopped with {} operations pending.", pending));

    Ok(())
}
