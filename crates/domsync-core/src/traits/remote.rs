//! Remote store trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::types::{Payload, TableName};

/// The remote data store queued writes are replayed against.
///
/// This is the only remote operation the offline-sync subsystem needs.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upsert `payload` into `target`, keyed by the payload's identity field.
    ///
    /// Implementations must be safe to repeat: submitting the same payload
    /// twice leaves the remote in the same state as submitting it once.
    /// Returns the record as stored by the remote.
    async fn submit(&self, target: &TableName, payload: &Payload) -> Result<Payload, RemoteError>;
}

#[async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for Arc<T> {
    async fn submit(&self, target: &TableName, payload: &Payload) -> Result<Payload, RemoteError> {
        (**self).submit(target, payload).await
    }
}
