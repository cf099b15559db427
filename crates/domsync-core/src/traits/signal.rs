//! Network signal trait.

use futures_core::Stream;

use crate::types::Connectivity;

/// A platform-level source of connectivity transitions.
///
/// Items are the connectivity after each platform event. Sources may repeat
/// a value; the monitor only treats changes as transitions.
pub trait NetworkSignal: Stream<Item = Connectivity> + Send + Unpin + 'static {
    /// The connectivity known synchronously at registration, if any.
    fn initial(&self) -> Option<Connectivity> {
        None
    }
}
