//! Filesystem queue storage.
//!
//! Layout under the queue root:
//!
//! ```text
//! ops/00000000000000000001.json   one file per queued operation
//! queue.seq                       highest id ever assigned
//! queue.lock                      exclusive lock held while assigning ids
//! ```
//!
//! Ids are zero-padded so a directory listing sorts in insertion order. The
//! sequence file is never decremented, so ids are not reused after removal,
//! even across restarts. The lock lets several processes share one queue.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use tracing::{debug, instrument, warn};

use domsync_core::Result;
use domsync_core::error::{Error, StorageError};
use domsync_core::traits::{QueueBackend, QueueStorage};
use domsync_core::types::{NewOperation, OperationId, PendingOperation};

use crate::atomic::write_atomic;

fn unavailable(context: &str, err: io::Error) -> Error {
    StorageError::Unavailable {
        message: format!("{}: {}", context, err),
    }
    .into()
}

fn write_failed(context: &str, err: impl std::fmt::Display) -> Error {
    StorageError::Write {
        message: format!("{}: {}", context, err),
    }
    .into()
}

fn read_failed(context: &str, err: io::Error) -> Error {
    StorageError::Read {
        message: format!("{}: {}", context, err),
    }
    .into()
}

/// A queue backend rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileQueue {
    root: PathBuf,
}

impl FileQueue {
    /// Create a backend for the queue at `root`. Nothing is touched on disk
    /// until the queue is opened.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The queue root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl QueueBackend for FileQueue {
    type Storage = FileQueueStorage;

    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn open(&self) -> Result<FileQueueStorage> {
        let storage = FileQueueStorage {
            root: self.root.clone(),
        };

        fs::create_dir_all(storage.ops_dir())
            .map_err(|e| unavailable("cannot create queue directory", e))?;
        // Proves the directory is writable before anything is queued.
        storage
            .open_lock()
            .map_err(|e| unavailable("cannot open queue lock", e))?;

        debug!("Opened file queue");
        Ok(storage)
    }
}

/// An open file queue.
#[derive(Debug)]
pub struct FileQueueStorage {
    root: PathBuf,
}

impl FileQueueStorage {
    fn ops_dir(&self) -> PathBuf {
        self.root.join("ops")
    }

    fn seq_path(&self) -> PathBuf {
        self.root.join("queue.seq")
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join("queue.lock")
    }

    fn op_path(&self, id: OperationId) -> PathBuf {
        self.ops_dir().join(format!("{:020}.json", id.get()))
    }

    fn open_lock(&self) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
    }

    fn read_seq(&self) -> io::Result<u64> {
        match fs::read_to_string(self.seq_path()) {
            Ok(content) => content.trim().parse().map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("bad queue.seq: {}", e))
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Ids of operation files currently on disk, unsorted.
    fn stored_ids(&self) -> io::Result<Vec<(u64, PathBuf)>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(self.ops_dir())? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
            {
                ids.push((id, path));
            }
        }
        Ok(ids)
    }

    fn put_locked(&self, op: NewOperation) -> Result<OperationId> {
        // Guard against a lost sequence file by never going below what is on disk.
        let seq = self
            .read_seq()
            .map_err(|e| write_failed("cannot read queue sequence", e))?;
        let highest_stored = self
            .stored_ids()
            .map_err(|e| write_failed("cannot scan queue", e))?
            .into_iter()
            .map(|(id, _)| id)
            .max()
            .unwrap_or(0);
        let id = OperationId::new(seq.max(highest_stored) + 1);

        let record = op.with_id(id);
        let content = serde_json::to_vec_pretty(&record)
            .map_err(|e| write_failed("cannot encode operation", e))?;

        // Bump the sequence first: a crash in between wastes an id rather
        // than reusing one.
        write_atomic(&self.seq_path(), id.get().to_string().as_bytes())
            .map_err(|e| write_failed("cannot update queue sequence", e))?;
        write_atomic(&self.op_path(id), &content)
            .map_err(|e| write_failed("cannot write operation", e))?;

        Ok(id)
    }
}

#[async_trait]
impl QueueStorage for FileQueueStorage {
    #[instrument(skip(self, op), fields(target = %op.target))]
    async fn put(&self, op: NewOperation) -> Result<OperationId> {
        let lock = self
            .open_lock()
            .map_err(|e| write_failed("cannot open queue lock", e))?;
        lock.lock_exclusive()
            .map_err(|e| write_failed("cannot lock queue", e))?;

        let result = self.put_locked(op);

        if let Err(e) = lock.unlock() {
            warn!(error = %e, "Failed to release queue lock");
        }

        let id = result?;
        debug!(%id, "Wrote operation file");
        Ok(id)
    }

    async fn get_all(&self) -> Result<Vec<PendingOperation>> {
        let stored = self
            .stored_ids()
            .map_err(|e| read_failed("cannot list queue", e))?;

        let mut ops = Vec::with_capacity(stored.len());
        for (id, path) in stored {
            let content = match fs::read(&path) {
                Ok(content) => content,
                // Removed by another process since the listing.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(read_failed("cannot read operation", e)),
            };

            match serde_json::from_slice::<PendingOperation>(&content) {
                Ok(op) if op.id.get() == id => ops.push(op),
                Ok(op) => {
                    warn!(path = %path.display(), stored_id = %op.id, "Skipping operation with mismatched id");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable queued operation");
                }
            }
        }

        ops.sort_by_key(|op| op.id);
        Ok(ops)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: OperationId) -> Result<()> {
        match fs::remove_file(self.op_path(id)) {
            Ok(()) => {
                debug!("Deleted operation file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(write_failed("cannot delete operation", e)),
        }
    }
}
