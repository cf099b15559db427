//! domsync-file - Filesystem implementations for domsync.
//!
//! Provides durable queue storage, a directory-backed remote store for
//! development and tests, and a network signal driven by a status file.

mod atomic;
mod queue;
mod remote;
mod signal;

pub use queue::{FileQueue, FileQueueStorage};
pub use remote::FileRemote;
pub use signal::{FileSignal, read_status};
