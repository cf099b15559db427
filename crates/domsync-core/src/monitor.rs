//! Connectivity monitor.
//!
//! Holds a single process-wide [`Connectivity`] value and publishes changes
//! through a `watch` channel. Callbacks registered with
//! [`ConnectivityMonitor::on_change`] get their own queue so that no
//! transition is lost to coalescing. Transitions come only from registered
//! [`NetworkSignal`] sources or direct [`ConnectivityMonitor::set`] calls;
//! the monitor never contacts the remote store itself.

use std::future::poll_fn;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::traits::NetworkSignal;
use crate::types::Connectivity;

/// Tracks whether the network is reachable.
///
/// Clones share the same state.
#[derive(Clone, Debug)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<Connectivity>>,
    listeners: Arc<Mutex<Vec<mpsc::UnboundedSender<Connectivity>>>>,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityMonitor {
    /// Create a monitor with the optimistic default, online.
    pub fn new() -> Self {
        Self::with_initial(Connectivity::Online)
    }

    /// Create a monitor starting from a known state.
    pub fn with_initial(initial: Connectivity) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            state: Arc::new(tx),
            listeners: Arc::default(),
        }
    }

    /// The current connectivity.
    pub fn current(&self) -> Connectivity {
        *self.state.borrow()
    }

    /// Returns true if currently online.
    pub fn is_online(&self) -> bool {
        self.current().is_online()
    }

    /// A receiver of the latest value. Transitions that happen between two
    /// reads are coalesced; use [`on_change`](Self::on_change) to see each one.
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }

    /// Apply a connectivity value.
    ///
    /// Returns true if this was a transition. Setting the current value
    /// notifies nobody.
    pub fn set(&self, connectivity: Connectivity) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == connectivity {
                false
            } else {
                *current = connectivity;
                // Sent under the watch lock so listeners see transitions in order.
                self.listeners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|tx| tx.send(connectivity).is_ok());
                true
            }
        });

        if changed {
            match connectivity {
                Connectivity::Online => info!("Network online"),
                Connectivity::Offline => warn!("Network offline"),
            }
        }
        changed
    }

    /// Follow a platform signal until the returned guard is dropped.
    ///
    /// A synchronous initial value from the signal is applied before this
    /// returns; otherwise the current state stands until the first item.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start<S: NetworkSignal>(&self, mut signal: S) -> MonitorGuard {
        if let Some(initial) = signal.initial() {
            self.set(initial);
        }

        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            while let Some(connectivity) =
                poll_fn(|cx| Pin::new(&mut signal).poll_next(cx)).await
            {
                monitor.set(connectivity);
            }
            debug!("Network signal ended");
        });

        MonitorGuard { handle }
    }

    /// Invoke `callback` on every transition until the guard is dropped.
    ///
    /// Each transition is delivered once, in order, with no debouncing, even
    /// when several happen before the callback task gets to run.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn on_change<F>(&self, mut callback: F) -> MonitorGuard
    where
        F: FnMut(Connectivity) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);

        let handle = tokio::spawn(async move {
            while let Some(connectivity) = rx.recv().await {
                callback(connectivity);
            }
        });

        MonitorGuard { handle }
    }
}

/// Keeps a monitor subscription alive. Dropping it unsubscribes.
#[derive(Debug)]
#[must_use = "dropping the guard immediately ends the subscription"]
pub struct MonitorGuard {
    handle: JoinHandle<()>,
}

impl MonitorGuard {
    /// End the subscription.
    pub fn stop(self) {
        drop(self);
    }

    /// Returns true if the subscription has ended on its own.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for MonitorGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A network signal driven by hand through a [`SignalSender`].
///
/// Useful for embedders that already receive platform connectivity events
/// through their own channel.
#[derive(Debug)]
pub struct ManualSignal {
    rx: mpsc::UnboundedReceiver<Connectivity>,
    initial: Option<Connectivity>,
}

/// Sending half of a [`ManualSignal`].
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<Connectivity>,
}

impl ManualSignal {
    /// Create a connected sender and signal.
    pub fn channel() -> (SignalSender, ManualSignal) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SignalSender { tx }, ManualSignal { rx, initial: None })
    }

    /// Report `initial` synchronously when the signal is registered.
    pub fn with_initial(mut self, initial: Connectivity) -> Self {
        self.initial = Some(initial);
        self
    }
}

impl Stream for ManualSignal {
    type Item = Connectivity;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Connectivity>> {
        self.rx.poll_recv(cx)
    }
}

impl NetworkSignal for ManualSignal {
    fn initial(&self) -> Option<Connectivity> {
        self.initial
    }
}

impl SignalSender {
    /// Report a connectivity value. Returns false once the signal is gone.
    pub fn send(&self, connectivity: Connectivity) -> bool {
        self.tx.send(connectivity).is_ok()
    }

    pub fn online(&self) -> bool {
        self.send(Connectivity::Online)
    }

    pub fn offline(&self) -> bool {
        self.send(Connectivity::Offline)
    }
}
