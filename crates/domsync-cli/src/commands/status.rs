//! Status command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use domsync_core::{Connectivity, OperationId};
use domsync_file::read_status;

use crate::config;
use crate::output;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Network status file to report connectivity from
    #[arg(long)]
    pub signal_file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    queue_dir: PathBuf,
    pending: usize,
    oldest_id: Option<OperationId>,
    oldest_enqueued_at: Option<DateTime<Utc>>,
    connectivity: Option<Connectivity>,
}

pub async fn run(args: StatusArgs, queue_dir: &Path) -> Result<()> {
    let queue = config::open_queue(queue_dir).await?;
    let ops = queue.list_all().await.context("Failed to read queue")?;
    let oldest = ops.first();

    let report = StatusReport {
        queue_dir: queue_dir.to_path_buf(),
        pending: ops.len(),
        oldest_id: oldest.map(|op| op.id),
        oldest_enqueued_at: oldest.map(|op| op.enqueued_at),
        connectivity: args.signal_file.as_deref().and_then(read_status),
    };

    if args.json {
        return output::json(&report);
    }

    output::field("Queue", &report.queue_dir.display().to_string());
    output::field("Pending", &report.pending.to_string());

    if let Some(op) = oldest {
        let age = Utc::now().signed_duration_since(op.enqueued_at);
        output::field(
            "Oldest",
            &format!("{} ({} min ago)", output::operation_line(op), age.num_minutes()),
        );
    }

    if args.signal_file.is_some() {
        let connectivity = match report.connectivity {
            Some(Connectivity::Online) => "online".green(),
            Some(Connectivity::Offline) => "offline".red(),
            None => "unknown".dimmed(),
        };
        output::field("Network", &connectivity.to_string());
    }

    Ok(())
}
