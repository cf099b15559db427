//! Observable sync notifications.

use serde::Serialize;

use crate::engine::DrainReport;
use crate::types::{OperationId, TableName};

/// A notification about queue and drain activity.
///
/// Enqueueing stays fire-and-forget; callers that need confirmation that a
/// write reached the remote store subscribe to these instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// An operation was durably queued.
    Enqueued { id: OperationId, target: TableName },

    /// A drain pass started over a snapshot of `pending` operations.
    DrainStarted { pending: usize },

    /// An operation was upserted remotely and removed from the queue.
    Applied { id: OperationId, target: TableName },

    /// The remote refused an operation; it stays queued.
    Rejected {
        id: OperationId,
        target: TableName,
        attempts: u32,
        reason: String,
    },

    /// An operation has been rejected often enough to need attention.
    ///
    /// Emitted once per operation, when its rejection count reaches the
    /// configured threshold. The operation is not dropped.
    Stalled {
        id: OperationId,
        target: TableName,
        attempts: u32,
    },

    /// The remote became unreachable; the pass stopped at this operation.
    Interrupted {
        id: OperationId,
        target: TableName,
        reason: String,
    },

    /// A drain pass finished.
    DrainFinished { report: DrainReport },
}
