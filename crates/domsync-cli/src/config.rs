//! Settings resolution and backend selection.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::Args;
use directories::ProjectDirs;
use tracing::{debug, warn};

use domsync_core::error::RemoteError;
use domsync_core::traits::RemoteStore;
use domsync_core::types::{Payload, RemoteUrl, TableName};
use domsync_core::{DurableQueue, SyncConfig};
use domsync_file::{FileQueue, FileRemote};
use domsync_rest::RestRemote;

/// Remote store options shared by commands that replay the queue.
#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    /// Remote store URL (https://... or file:///path)
    #[arg(long, env = "DOMSYNC_REMOTE")]
    pub remote: Option<String>,

    /// API key for the hosted backend
    #[arg(long, env = "DOMSYNC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Payload field used as the upsert key
    #[arg(long, default_value = domsync_core::DEFAULT_IDENTITY_FIELD)]
    pub identity_field: String,

    /// Rejections after which an operation is reported as stalled (0 disables)
    #[arg(long, default_value_t = SyncConfig::default().flag_after_attempts)]
    pub flag_after: u32,
}

impl RemoteArgs {
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            flag_after_attempts: self.flag_after,
            ..SyncConfig::default()
        }
    }
}

/// Resolve the queue directory: explicit flag or env, else the platform
/// data directory.
pub fn queue_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    let dirs =
        ProjectDirs::from("", "", "domsync").context("Could not determine data directory")?;
    let dir = dirs.data_dir().join("queue");
    debug!(dir = %dir.display(), "Using default queue directory");
    Ok(dir)
}

/// Open the queue at `dir`.
pub async fn open_queue(dir: &Path) -> Result<DurableQueue<FileQueue>> {
    let queue = DurableQueue::new(FileQueue::new(dir));
    queue
        .open()
        .await
        .with_context(|| format!("Failed to open queue at {}", dir.display()))?;
    Ok(queue)
}

/// Remote store wrapper for CLI use.
#[derive(Debug)]
pub enum CliRemote {
    File(FileRemote),
    Rest(RestRemote),
}

impl CliRemote {
    /// Build the remote named by `args`.
    pub fn resolve(args: &RemoteArgs) -> Result<Self> {
        let Some(raw) = args.remote.as_deref() else {
            bail!("No remote configured. Pass --remote or set DOMSYNC_REMOTE.");
        };
        let url = RemoteUrl::new(raw).context("Invalid remote URL")?;

        if url.is_local() {
            debug!(%url, "Using file remote");
            let remote = FileRemote::from_url(&url)
                .context("Invalid file remote")?
                .with_identity_field(&args.identity_field);
            Ok(CliRemote::File(remote))
        } else {
            if args.api_key.is_none() {
                warn!(%url, "No API key configured, requests will be anonymous");
            }
            let remote = RestRemote::new(url, args.api_key.as_deref())
                .context("Failed to create REST remote")?
                .with_identity_field(&args.identity_field);
            Ok(CliRemote::Rest(remote))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CliRemote::File(remote) => format!("file://{}", remote.root().display()),
            CliRemote::Rest(remote) => remote.url().to_string(),
        }
    }
}

#[async_trait]
impl RemoteStore for CliRemote {
    async fn submit(
        &self,
        target: &TableName,
        payload: &Payload,
    ) -> std::result::Result<Payload, RemoteError> {
        match self {
            CliRemote::File(remote) => remote.submit(target, payload).await,
            CliRemote::Rest(remote) => remote.submit(target, payload).await,
        }
    }
}
