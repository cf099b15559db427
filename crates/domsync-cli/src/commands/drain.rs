//! Drain command implementation.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use domsync_core::{DrainOutcome, SyncEngine, SyncEvent};

use crate::config::{self, CliRemote, RemoteArgs};
use crate::output;

#[derive(Args, Debug)]
pub struct DrainArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Print the drain report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: DrainArgs, queue_dir: &Path) -> Result<()> {
    let remote = CliRemote::resolve(&args.remote)?;
    let queue = config::open_queue(queue_dir).await?;

    output::note(&format!("Draining into {}", remote.describe()));

    let engine = SyncEngine::new(Arc::new(queue), remote, args.remote.sync_config());
    let mut events = engine.subscribe();

    let outcome = engine.drain().await.context("Failed to drain queue")?;
    let DrainOutcome::Completed(report) = outcome else {
        // A fresh engine has no other pass running and ignores connectivity.
        output::warning("Drain did not run.");
        return Ok(());
    };

    while let Ok(event) = events.try_recv() {
        match event {
            SyncEvent::Rejected { id, reason, .. } => {
                output::error(&format!("#{} rejected: {}", id, reason));
            }
            SyncEvent::Interrupted { id, reason, .. } => {
                output::warning(&format!("Remote unavailable at #{}: {}", id, reason));
            }
            _ => {}
        }
    }

    if args.json {
        output::json(&report)?;
        return Ok(());
    }

    output::field("Applied", &report.applied.len().to_string());
    output::field("Rejected", &report.rejected.len().to_string());
    output::field("Remaining", &report.remaining().to_string());

    if report.remaining() == 0 {
        output::success("Queue drained");
    } else if report.is_interrupted() {
        output::warning("Drain stopped early; remaining operations stay queued");
    }

    Ok(())
}
