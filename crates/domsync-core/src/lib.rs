//! domsync-core - Offline write queue and sync engine.
//!
//! Application code writes through [`OfflineSync`]. Writes land in a
//! [`DurableQueue`] first and are replayed against a [`RemoteStore`] by the
//! [`SyncEngine`] whenever the [`ConnectivityMonitor`] reports the network
//! as online.

pub mod engine;
pub mod error;
pub mod events;
pub mod facade;
pub mod monitor;
pub mod queue;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing;

pub use engine::{DrainOutcome, DrainReport, EngineState, SyncConfig, SyncEngine};
pub use error::{Error, InvalidInputError, RemoteError, StorageError};
pub use events::SyncEvent;
pub use facade::OfflineSync;
pub use monitor::{ConnectivityMonitor, ManualSignal, MonitorGuard, SignalSender};
pub use queue::DurableQueue;
pub use traits::{NetworkSignal, QueueBackend, QueueStorage, RemoteStore};
pub use types::{
    Connectivity, DEFAULT_IDENTITY_FIELD, NewOperation, OperationId, Payload, PendingOperation,
    RemoteUrl, TableName,
};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
