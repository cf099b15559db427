//! Remove command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use domsync_core::OperationId;

use crate::config;
use crate::output;

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Operation id, as printed by `enqueue` or `list`
    pub id: u64,
}

pub async fn run(args: RemoveArgs, queue_dir: &Path) -> Result<()> {
    let id = OperationId::new(args.id);
    let queue = config::open_queue(queue_dir).await?;

    let Some(op) = queue.get(id).await.context("Failed to read queue")? else {
        output::note(&format!("Operation #{} is not queued.", id));
        return Ok(());
    };

    queue
        .remove(id)
        .await
        .context("Failed to remove operation")?;

    output::success(&format!("Removed {}", output::operation_line(&op)));
    Ok(())
}
