//! List command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use crate::config;
use crate::output;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(args: ListArgs, queue_dir: &Path) -> Result<()> {
    let queue = config::open_queue(queue_dir).await?;
    let ops = queue.list_all().await.context("Failed to read queue")?;

    if ops.is_empty() {
        output::note("Queue is empty.");
        return Ok(());
    }

    for op in &ops {
        if args.pretty {
            output::json_pretty(op)?;
        } else {
            output::json(op)?;
        }
    }

    Ok(())
}
