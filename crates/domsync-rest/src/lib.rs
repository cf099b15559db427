//! domsync-rest - REST-backed remote store for domsync.
//!
//! Replays queued writes as upserts against a PostgREST-style endpoint
//! (`POST {base}/rest/v1/{table}`).

mod client;
mod remote;

pub use client::RestClient;
pub use remote::RestRemote;
