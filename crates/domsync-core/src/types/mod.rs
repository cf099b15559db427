//! Core domsync types.
//!
//! These types enforce their invariants at construction time,
//! ensuring invalid states are unrepresentable.

mod connectivity;
mod operation;
mod payload;
mod remote_url;
mod table_name;

pub use connectivity::Connectivity;
pub use operation::{NewOperation, OperationId, PendingOperation};
pub use payload::{DEFAULT_IDENTITY_FIELD, Payload};
pub use remote_url::RemoteUrl;
pub use table_name::TableName;
