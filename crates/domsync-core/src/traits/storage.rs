//! Local queue storage traits.

use async_trait::async_trait;

use crate::Result;
use crate::types::{NewOperation, OperationId, PendingOperation};

/// A source of local persistent storage for the queue.
///
/// Opening may fail when the platform denies access (quota exhausted,
/// permission denied); implementations report that as
/// [`StorageError::Unavailable`](crate::error::StorageError::Unavailable).
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Storage handle type for this backend.
    type Storage: QueueStorage;

    /// Open the storage. Called at most once per queue.
    async fn open(&self) -> Result<Self::Storage>;
}

/// An open handle on persistent queue storage.
#[async_trait]
pub trait QueueStorage: Send + Sync {
    /// Persist an operation and return its newly assigned id.
    ///
    /// Ids must be strictly increasing and never reused.
    async fn put(&self, op: NewOperation) -> Result<OperationId>;

    /// Return every stored operation, in any order.
    async fn get_all(&self) -> Result<Vec<PendingOperation>>;

    /// Delete an operation. Deleting an absent id is not an error.
    async fn delete(&self, id: OperationId) -> Result<()>;
}
