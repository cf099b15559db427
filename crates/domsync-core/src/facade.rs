//! The public entry point for application code.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::Result;
use crate::engine::{DrainOutcome, SyncConfig, SyncEngine};
use crate::events::SyncEvent;
use crate::monitor::{ConnectivityMonitor, MonitorGuard};
use crate::queue::DurableQueue;
use crate::traits::{NetworkSignal, QueueBackend, RemoteStore};
use crate::types::{OperationId, Payload, PendingOperation, TableName};

/// An offline-first write path.
///
/// Owns a connectivity monitor, a durable queue and a sync engine. Writes
/// are queued locally and replayed whenever the network comes back. Drop the
/// value (or call [`shutdown`](Self::shutdown)) to stop background work.
///
/// # Example
///
/// ```ignore
/// let sync = OfflineSync::start(FileQueue::new(dir), remote, signal, SyncConfig::default());
/// let id = sync.save_offline_data(players, payload).await?;
/// ```
pub struct OfflineSync<B, R>
where
    B: QueueBackend + 'static,
    R: RemoteStore + 'static,
{
    engine: Arc<SyncEngine<B, R>>,
    monitor: ConnectivityMonitor,
    signal: Option<MonitorGuard>,
    auto_drain: JoinHandle<()>,
}

impl<B, R> OfflineSync<B, R>
where
    B: QueueBackend + 'static,
    R: RemoteStore + 'static,
{
    /// Start syncing, following `signal` for connectivity.
    ///
    /// If the monitor is online once the signal's initial value is applied,
    /// a drain runs immediately. The queue itself opens lazily.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start<S: NetworkSignal>(backend: B, remote: R, signal: S, config: SyncConfig) -> Self {
        let monitor = ConnectivityMonitor::new();
        let guard = monitor.start(signal);
        Self::assemble(backend, remote, monitor, Some(guard), config)
    }

    /// Start syncing against an externally driven monitor.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn with_monitor(backend: B, remote: R, monitor: ConnectivityMonitor, config: SyncConfig) -> Self {
        Self::assemble(backend, remote, monitor, None, config)
    }

    fn assemble(
        backend: B,
        remote: R,
        monitor: ConnectivityMonitor,
        signal: Option<MonitorGuard>,
        config: SyncConfig,
    ) -> Self {
        let queue = Arc::new(DurableQueue::new(backend));
        let engine = Arc::new(SyncEngine::new(queue, remote, config));
        let auto_drain = tokio::spawn(Arc::clone(&engine).run(monitor.subscribe()));

        info!(online = monitor.is_online(), "Offline sync started");

        Self {
            engine,
            monitor,
            signal,
            auto_drain,
        }
    }

    /// Whether the network is currently reachable.
    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Queue a write for the remote store.
    ///
    /// Returns once the write is durable locally; it does not wait for or
    /// report the remote outcome. Subscribe to events for that. A local
    /// storage failure is returned, and nothing is queued.
    pub async fn save_offline_data(&self, target: TableName, payload: Payload) -> Result<OperationId> {
        let id = self.engine.queue().enqueue(target.clone(), payload).await?;
        self.engine.emit(SyncEvent::Enqueued { id, target });
        Ok(id)
    }

    /// Drain the queue now.
    ///
    /// Returns [`DrainOutcome::Offline`] without touching the queue when
    /// offline.
    pub async fn sync_now(&self) -> Result<DrainOutcome> {
        if !self.monitor.is_online() {
            debug!("Offline, skipping requested drain");
            return Ok(DrainOutcome::Offline);
        }
        self.engine.drain().await
    }

    /// Subscribe to sync events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.engine.subscribe()
    }

    /// Operations still waiting to reach the remote, oldest first.
    pub async fn pending(&self) -> Result<Vec<PendingOperation>> {
        self.engine.queue().list_all().await
    }

    /// Operations flagged as stalled, with their rejection counts.
    pub fn stalled(&self) -> Vec<(OperationId, u32)> {
        self.engine.stalled()
    }

    /// The connectivity monitor driving auto-drain.
    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// The underlying sync engine.
    pub fn engine(&self) -> &Arc<SyncEngine<B, R>> {
        &self.engine
    }

    /// Stop following the network signal and stop auto-draining.
    ///
    /// A drain already in progress runs to completion.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl<B, R> Drop for OfflineSync<B, R>
where
    B: QueueBackend + 'static,
    R: RemoteStore + 'static,
{
    fn drop(&mut self) {
        self.signal.take();
        self.auto_drain.abort();
        debug!("Offline sync stopped");
    }
}
