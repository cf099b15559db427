//! Queued operation types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Payload, TableName};

/// Locally assigned identifier of a queued operation.
///
/// Identifiers increase strictly with insertion order and are never reused,
/// so sorting by id yields the oldest operation first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(u64);

impl OperationId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OperationId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// An operation about to be written to queue storage.
///
/// Storage assigns the [`OperationId`] on insert.
#[derive(Debug, Clone)]
pub struct NewOperation {
    /// The remote table the write applies to.
    pub target: TableName,
    /// The record to upsert.
    pub payload: Payload,
    /// When the operation was queued.
    pub enqueued_at: DateTime<Utc>,
}

impl NewOperation {
    /// Create a new operation stamped with the current time.
    pub fn new(target: TableName, payload: Payload) -> Self {
        Self {
            target,
            payload,
            enqueued_at: Utc::now(),
        }
    }

    /// Attach the storage-assigned id.
    pub fn with_id(self, id: OperationId) -> PendingOperation {
        PendingOperation {
            id,
            target: self.target,
            payload: self.payload,
            enqueued_at: self.enqueued_at,
        }
    }
}

/// A durable record describing one deferred write.
///
/// Every pending operation stands for a write not yet confirmed by the
/// remote store. Operations are immutable once queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Queue-assigned identifier.
    pub id: OperationId,
    /// The remote table the write applies to.
    pub target: TableName,
    /// The record to upsert.
    pub payload: Payload,
    /// When the operation was queued.
    pub enqueued_at: DateTime<Utc>,
}
