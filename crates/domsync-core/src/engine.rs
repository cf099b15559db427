//! Sync engine: replays queued operations against the remote store.
//!
//! The engine is a two-state machine, `Idle` and `Draining`. A drain pass
//! snapshots the queue, submits each operation in insertion order, and
//! removes the ones the remote confirms. Operations enqueued during a pass
//! wait for the next one.
//!
//! At most one pass runs at a time. A drain requested while another is in
//! progress is ignored rather than queued behind it, since two passes over
//! the same snapshot would double-apply writes and race on removal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::error::RemoteError;
use crate::events::SyncEvent;
use crate::queue::DurableQueue;
use crate::traits::{QueueBackend, RemoteStore};
use crate::types::{Connectivity, OperationId};

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Rejections after which an operation is flagged as stalled.
    /// Zero disables flagging.
    pub flag_after_attempts: u32,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            flag_after_attempts: 5,
            event_capacity: 64,
        }
    }
}

/// State of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No drain in progress.
    Idle,
    /// A drain pass is walking its snapshot.
    Draining,
}

/// Result of requesting a drain.
#[derive(Debug, Clone, PartialEq)]
pub enum DrainOutcome {
    /// A pass ran to the end of its snapshot, or stopped early because the
    /// remote became unavailable.
    Completed(DrainReport),
    /// Another pass was already running; this request was ignored.
    AlreadyDraining,
    /// Connectivity is offline; the queue was not touched.
    Offline,
}

/// What one drain pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Number of operations in the snapshot taken at drain start.
    pub snapshot: usize,
    /// Operations upserted and removed from the queue.
    pub applied: Vec<OperationId>,
    /// Operations the remote refused; still queued.
    pub rejected: Vec<OperationId>,
    /// Operation at which the remote became unavailable, if any.
    pub interrupted_at: Option<OperationId>,
    /// Operations after the interruption point that were not submitted.
    pub not_attempted: Vec<OperationId>,
    /// Operations upserted remotely whose local removal failed.
    pub unremoved: Vec<OperationId>,
}

impl DrainReport {
    /// Returns true if the pass stopped before the end of its snapshot.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted_at.is_some()
    }

    /// Number of snapshot operations still queued after the pass.
    pub fn remaining(&self) -> usize {
        self.rejected.len()
            + usize::from(self.interrupted_at.is_some())
            + self.not_attempted.len()
            + self.unremoved.len()
    }
}

/// Resets the draining flag when a pass ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Replays the durable queue against a remote store.
pub struct SyncEngine<B: QueueBackend, R: RemoteStore> {
    queue: Arc<DurableQueue<B>>,
    remote: R,
    config: SyncConfig,
    draining: AtomicBool,
    /// Rejection counts per operation; kept beside the queue so queued
    /// records stay immutable.
    attempts: Mutex<HashMap<OperationId, u32>>,
    events: broadcast::Sender<SyncEvent>,
}

impl<B: QueueBackend, R: RemoteStore> SyncEngine<B, R> {
    /// Create an engine over a shared queue.
    pub fn new(queue: Arc<DurableQueue<B>>, remote: R, config: SyncConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            queue,
            remote,
            config,
            draining: AtomicBool::new(false),
            attempts: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// The queue this engine drains.
    pub fn queue(&self) -> &Arc<DurableQueue<B>> {
        &self.queue
    }

    /// The remote store this engine submits to.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// The engine configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Current engine state.
    pub fn state(&self) -> EngineState {
        if self.draining.load(Ordering::Acquire) {
            EngineState::Draining
        } else {
            EngineState::Idle
        }
    }

    /// Subscribe to sync events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Operations that reached the stalled threshold, with their rejection
    /// counts, ordered by id.
    pub fn stalled(&self) -> Vec<(OperationId, u32)> {
        let threshold = self.config.flag_after_attempts;
        if threshold == 0 {
            return Vec::new();
        }
        let attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stalled: Vec<_> = attempts
            .iter()
            .filter(|(_, count)| **count >= threshold)
            .map(|(id, count)| (*id, *count))
            .collect();
        stalled.sort();
        stalled
    }

    pub(crate) fn emit(&self, event: SyncEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Run one drain pass over the queue.
    ///
    /// Returns [`DrainOutcome::AlreadyDraining`] without touching the queue
    /// if another pass is running. Per-operation failures never fail the
    /// pass: rejected operations stay queued and an unavailable remote ends
    /// the pass early. Only a failure to read the queue is an error.
    #[instrument(skip(self))]
    pub async fn drain(&self) -> Result<DrainOutcome> {
        let Some(_guard) = DrainGuard::acquire(&self.draining) else {
            debug!("Drain already in progress, ignoring request");
            return Ok(DrainOutcome::AlreadyDraining);
        };

        let snapshot = self.queue.list_all().await?;
        self.prune_attempts(&snapshot.iter().map(|op| op.id).collect::<Vec<_>>());

        info!(pending = snapshot.len(), "Drain started");
        self.emit(SyncEvent::DrainStarted {
            pending: snapshot.len(),
        });

        let mut report = DrainReport {
            snapshot: snapshot.len(),
            ..DrainReport::default()
        };

        let mut ops = snapshot.into_iter();
        while let Some(op) = ops.next() {
            match self.remote.submit(&op.target, &op.payload).await {
                Ok(_) => {
                    self.clear_attempts(op.id);
                    match self.queue.remove(op.id).await {
                        Ok(()) => {
                            debug!(id = %op.id, target = %op.target, "Applied queued operation");
                            report.applied.push(op.id);
                            self.emit(SyncEvent::Applied {
                                id: op.id,
                                target: op.target,
                            });
                        }
                        Err(e) => {
                            // Re-submitting on the next pass is a harmless upsert.
                            warn!(id = %op.id, error = %e, "Applied operation could not be removed");
                            report.unremoved.push(op.id);
                        }
                    }
                }
                Err(RemoteError::Unavailable { message }) => {
                    warn!(id = %op.id, reason = %message, "Remote unavailable, stopping drain");
                    report.interrupted_at = Some(op.id);
                    report.not_attempted = ops.by_ref().map(|rest| rest.id).collect();
                    self.emit(SyncEvent::Interrupted {
                        id: op.id,
                        target: op.target,
                        reason: message,
                    });
                    break;
                }
                Err(err @ RemoteError::Rejected { .. }) => {
                    let attempts = self.record_attempt(op.id);
                    warn!(
                        id = %op.id,
                        target = %op.target,
                        attempts,
                        error = %err,
                        "Remote rejected queued operation"
                    );
                    report.rejected.push(op.id);
                    self.emit(SyncEvent::Rejected {
                        id: op.id,
                        target: op.target.clone(),
                        attempts,
                        reason: err.to_string(),
                    });

                    if attempts == self.config.flag_after_attempts {
                        warn!(id = %op.id, attempts, "Operation stalled, needs manual attention");
                        self.emit(SyncEvent::Stalled {
                            id: op.id,
                            target: op.target,
                            attempts,
                        });
                    }
                }
            }
        }

        info!(
            applied = report.applied.len(),
            rejected = report.rejected.len(),
            remaining = report.remaining(),
            interrupted = report.is_interrupted(),
            "Drain finished"
        );
        self.emit(SyncEvent::DrainFinished {
            report: report.clone(),
        });

        Ok(DrainOutcome::Completed(report))
    }

    fn record_attempt(&self, id: OperationId) -> u32 {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let count = attempts.entry(id).or_insert(0);
        *count += 1;
        *count
    }

    fn clear_attempts(&self, id: OperationId) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// Forget counts for operations no longer queued.
    fn prune_attempts(&self, queued: &[OperationId]) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|id, _| queued.contains(id));
    }
}

impl<B, R> SyncEngine<B, R>
where
    B: QueueBackend + 'static,
    R: RemoteStore + 'static,
{
    /// Start a drain pass in the background.
    ///
    /// Failures to read the queue are logged; the re-entrancy guard still
    /// applies, so this is a no-op while a pass is running.
    pub fn spawn_drain(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = engine.drain().await {
                warn!(error = %e, "Drain failed to read queue");
            }
        })
    }

    /// Drain whenever connectivity becomes online.
    ///
    /// Drains once immediately if already online. Each transition spawns its
    /// own pass, so an online signal that arrives mid-drain meets the
    /// re-entrancy guard and is ignored. Returns when the monitor is dropped.
    pub async fn run(self: Arc<Self>, mut connectivity: watch::Receiver<Connectivity>) {
        if connectivity.borrow_and_update().is_online() {
            self.spawn_drain();
        }

        while connectivity.changed().await.is_ok() {
            let now = *connectivity.borrow_and_update();
            if now.is_online() {
                debug!("Connectivity restored, draining queue");
                self.spawn_drain();
            }
        }

        debug!("Connectivity monitor closed, auto-drain stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::testing::{MemoryBackend, ScriptedRemote, payload, table};

    async fn engine_with(
        remote: ScriptedRemote,
        ids: &[&str],
    ) -> (Arc<SyncEngine<MemoryBackend, Arc<ScriptedRemote>>>, Arc<ScriptedRemote>) {
        engine_with_config(remote, ids, SyncConfig::default()).await
    }

    async fn engine_with_config(
        remote: ScriptedRemote,
        ids: &[&str],
        config: SyncConfig,
    ) -> (Arc<SyncEngine<MemoryBackend, Arc<ScriptedRemote>>>, Arc<ScriptedRemote>) {
        let queue = Arc::new(DurableQueue::new(MemoryBackend::new()));
        for id in ids {
            queue.enqueue(table("players"), payload(id)).await.unwrap();
        }
        let remote = Arc::new(remote);
        let engine = Arc::new(SyncEngine::new(queue, remote.clone(), config));
        (engine, remote)
    }

    async fn queued_ids(engine: &SyncEngine<MemoryBackend, Arc<ScriptedRemote>>) -> Vec<String> {
        engine
            .queue()
            .list_all()
            .await
            .unwrap()
            .iter()
            .filter_map(|op| op.payload.identity_key("id"))
            .collect()
    }

    fn completed(outcome: DrainOutcome) -> DrainReport {
        match outcome {
            DrainOutcome::Completed(report) => report,
            other => panic!("expected completed drain, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn drain_applies_everything_in_order() {
        let (engine, remote) = engine_with(ScriptedRemote::new(), &["a", "b", "c"]).await;

        let report = completed(engine.drain().await.unwrap());

        assert_eq!(report.snapshot, 3);
        assert_eq!(report.applied.len(), 3);
        assert_eq!(report.remaining(), 0);
        assert_eq!(remote.submissions(), vec!["a", "b", "c"]);
        assert!(engine.queue().is_empty().await.unwrap());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn rejected_item_does_not_block_later_items() {
        let remote = ScriptedRemote::new();
        remote.fail("b", RemoteError::rejected("constraint violation"));
        let (engine, remote) = engine_with(remote, &["a", "b", "c"]).await;

        let report = completed(engine.drain().await.unwrap());

        assert_eq!(queued_ids(&engine).await, vec!["b"]);
        assert_eq!(report.applied.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert!(!report.is_interrupted());
        assert!(remote.record("players", "a").is_some());
        assert!(remote.record("players", "c").is_some());
    }

    #[tokio::test]
    async fn unavailable_remote_stops_the_pass() {
        let remote = ScriptedRemote::new();
        remote.fail("b", RemoteError::unavailable("connection reset"));
        let (engine, remote) = engine_with(remote, &["a", "b", "c"]).await;

        let report = completed(engine.drain().await.unwrap());

        assert_eq!(remote.submissions(), vec!["a", "b"]);
        assert_eq!(queued_ids(&engine).await, vec!["b", "c"]);
        assert!(report.is_interrupted());
        assert_eq!(report.not_attempted.len(), 1);
        assert_eq!(report.remaining(), 2);
        assert!(remote.record("players", "c").is_none());
    }

    #[tokio::test]
    async fn replaying_an_operation_twice_is_idempotent() {
        let (engine, remote) = engine_with(ScriptedRemote::new(), &["p1"]).await;
        let op = engine.queue().list_all().await.unwrap().remove(0);

        // Simulate a crash between submit and remove: the op is submitted once,
        // stays queued, and is replayed by the next drain.
        remote.submit(&op.target, &op.payload).await.unwrap();
        let after_first = remote.record("players", "p1");

        completed(engine.drain().await.unwrap());

        assert_eq!(remote.record_count(), 1);
        assert_eq!(remote.record("players", "p1"), after_first);
        assert!(engine.queue().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn overlapping_drains_are_ignored() {
        let remote = ScriptedRemote::with_delay(Duration::from_millis(20));
        let (engine, remote) = engine_with(remote, &["a", "b"]).await;

        let (first, second) = tokio::join!(engine.drain(), engine.drain());
        let outcomes = [first.unwrap(), second.unwrap()];

        let completed_count = outcomes
            .iter()
            .filter(|o| matches!(o, DrainOutcome::Completed(_)))
            .count();
        assert_eq!(completed_count, 1);
        assert!(outcomes.contains(&DrainOutcome::AlreadyDraining));
        assert_eq!(remote.max_in_flight(), 1);
        assert_eq!(remote.submissions(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn operations_enqueued_mid_drain_wait_for_next_pass() {
        let remote = ScriptedRemote::with_delay(Duration::from_millis(20));
        let (engine, remote) = engine_with(remote, &["a", "b"]).await;

        let enqueue_late = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            engine
                .queue()
                .enqueue(table("players"), payload("late"))
                .await
                .unwrap();
        };
        let (outcome, ()) = tokio::join!(engine.drain(), enqueue_late);

        let report = completed(outcome.unwrap());
        assert_eq!(report.snapshot, 2);
        assert_eq!(queued_ids(&engine).await, vec!["late"]);
        assert!(!remote.submissions().contains(&"late".to_string()));

        completed(engine.drain().await.unwrap());
        assert!(engine.queue().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn stalled_is_flagged_once_at_threshold() {
        let remote = ScriptedRemote::new();
        remote.fail("bad", RemoteError::rejected("invalid nickname"));
        let config = SyncConfig {
            flag_after_attempts: 2,
            ..SyncConfig::default()
        };
        let (engine, _remote) = engine_with_config(remote, &["bad"], config).await;
        let mut events = engine.subscribe();

        for _ in 0..3 {
            completed(engine.drain().await.unwrap());
        }

        let mut stalled_events = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SyncEvent::Stalled { attempts: 2, .. }) {
                stalled_events += 1;
            }
        }
        assert_eq!(stalled_events, 1);

        let stalled = engine.stalled();
        assert_eq!(stalled.len(), 1);
        assert_eq!(stalled[0].1, 3);
        // Still queued: flagging never drops an operation.
        assert_eq!(engine.queue().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn attempts_reset_once_applied() {
        let remote = ScriptedRemote::new();
        remote.fail("p1", RemoteError::rejected("temporarily locked"));
        let config = SyncConfig {
            flag_after_attempts: 1,
            ..SyncConfig::default()
        };
        let (engine, remote) = engine_with_config(remote, &["p1"], config).await;

        completed(engine.drain().await.unwrap());
        assert_eq!(engine.stalled().len(), 1);

        remote.clear_failures();
        completed(engine.drain().await.unwrap());
        assert!(engine.stalled().is_empty());
        assert!(engine.queue().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn drain_emits_events_in_order() {
        let remote = ScriptedRemote::new();
        remote.fail("b", RemoteError::rejected("nope"));
        let (engine, _remote) = engine_with(remote, &["a", "b"]).await;
        let mut events = engine.subscribe();

        completed(engine.drain().await.unwrap());

        assert_eq!(events.try_recv().unwrap(), SyncEvent::DrainStarted { pending: 2 });
        assert!(matches!(events.try_recv().unwrap(), SyncEvent::Applied { .. }));
        assert!(matches!(
            events.try_recv().unwrap(),
            SyncEvent::Rejected { attempts: 1, .. }
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            SyncEvent::DrainFinished { .. }
        ));
    }

    #[tokio::test]
    async fn empty_queue_drains_cleanly() {
        let (engine, remote) = engine_with(ScriptedRemote::new(), &[]).await;
        let report = completed(engine.drain().await.unwrap());
        assert_eq!(report, DrainReport::default());
        assert!(remote.submissions().is_empty());
    }
}
