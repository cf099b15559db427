//! Core traits for the collaborators of the sync engine.

mod remote;
mod signal;
mod storage;

pub use remote::RemoteStore;
pub use signal::NetworkSignal;
pub use storage::{QueueBackend, QueueStorage};
