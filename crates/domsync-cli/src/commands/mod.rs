//! Subcommand implementations.

pub mod drain;
pub mod enqueue;
pub mod list;
pub mod remove;
pub mod status;
pub mod watch;
