//! Local durable queue of pending writes.
//!
//! The queue persists [`PendingOperation`]s through a [`QueueBackend`] so
//! they survive process restarts, independent of network state. The
//! storage handle is acquired lazily on first use and kept for the lifetime
//! of the queue.

use tokio::sync::OnceCell;
use tracing::{debug, error, instrument};

use crate::Result;
use crate::traits::{QueueBackend, QueueStorage};
use crate::types::{NewOperation, OperationId, Payload, PendingOperation, TableName};

/// Durable FIFO of operations waiting to be replayed.
pub struct DurableQueue<B: QueueBackend> {
    backend: B,
    storage: OnceCell<B::Storage>,
}

impl<B: QueueBackend> DurableQueue<B> {
    /// Create a queue over the given backend without opening it.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            storage: OnceCell::new(),
        }
    }

    /// Access the backend this queue was created with.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns true once storage has been opened.
    pub fn is_open(&self) -> bool {
        self.storage.initialized()
    }

    /// Open the storage handle.
    ///
    /// Idempotent: once open, the existing handle is returned. Concurrent
    /// first calls open the backend only once. A failed open is not cached,
    /// so a later call retries.
    pub async fn open(&self) -> Result<&B::Storage> {
        self.storage
            .get_or_try_init(|| async {
                debug!("Opening queue storage");
                self.backend.open().await
            })
            .await
    }

    /// Append an operation and return its assigned id.
    ///
    /// If the storage write fails, nothing is queued and the error is
    /// returned to the caller.
    #[instrument(skip(self, payload), fields(%target))]
    pub async fn enqueue(&self, target: TableName, payload: Payload) -> Result<OperationId> {
        let storage = self.open().await?;
        match storage.put(NewOperation::new(target, payload)).await {
            Ok(id) => {
                debug!(%id, "Queued operation");
                Ok(id)
            }
            Err(e) => {
                error!(error = %e, "Failed to queue operation");
                Err(e)
            }
        }
    }

    /// All queued operations, oldest first.
    pub async fn list_all(&self) -> Result<Vec<PendingOperation>> {
        let mut ops = self.open().await?.get_all().await?;
        ops.sort_by_key(|op| op.id);
        Ok(ops)
    }

    /// Look up a single queued operation.
    pub async fn get(&self, id: OperationId) -> Result<Option<PendingOperation>> {
        Ok(self.list_all().await?.into_iter().find(|op| op.id == id))
    }

    /// Delete an operation. Absent ids are ignored.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: OperationId) -> Result<()> {
        self.open().await?.delete(id).await
    }

    /// Number of queued operations.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.open().await?.get_all().await?.len())
    }

    /// Check if the queue is empty.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
