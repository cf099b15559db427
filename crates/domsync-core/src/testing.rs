//! In-memory collaborators for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::Result;
use crate::error::{RemoteError, StorageError};
use crate::traits::{QueueBackend, QueueStorage, RemoteStore};
use crate::types::{NewOperation, OperationId, Payload, PendingOperation, TableName};

pub fn table(name: &str) -> TableName {
    TableName::new(name).unwrap()
}

pub fn payload(id: &str) -> Payload {
    Payload::new(json!({ "id": id, "nickname": format!("player-{}", id) })).unwrap()
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    ops: BTreeMap<OperationId, PendingOperation>,
    opens: usize,
    deny_open: bool,
    fail_writes: bool,
}

/// Queue backend that keeps operations in a shared map.
///
/// Clones share state, so a second queue over a clone behaves like the
/// same storage reopened after a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.inner.lock().unwrap().opens
    }

    pub fn set_deny_open(&self, deny: bool) {
        self.inner.lock().unwrap().deny_open = deny;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_writes = fail;
    }
}

#[async_trait]
impl QueueBackend for MemoryBackend {
    type Storage = MemoryStorage;

    async fn open(&self) -> Result<MemoryStorage> {
        let mut state = self.inner.lock().unwrap();
        state.opens += 1;
        if state.deny_open {
            return Err(StorageError::Unavailable {
                message: "permission denied".to_string(),
            }
            .into());
        }
        Ok(MemoryStorage {
            inner: self.inner.clone(),
        })
    }
}

#[derive(Debug)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl QueueStorage for MemoryStorage {
    async fn put(&self, op: NewOperation) -> Result<OperationId> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_writes {
            return Err(StorageError::Write {
                message: "quota exceeded".to_string(),
            }
            .into());
        }
        state.next_id += 1;
        let id = OperationId::new(state.next_id);
        state.ops.insert(id, op.with_id(id));
        Ok(id)
    }

    async fn get_all(&self) -> Result<Vec<PendingOperation>> {
        // Reverse order so callers cannot rely on storage ordering.
        Ok(self.inner.lock().unwrap().ops.values().rev().cloned().collect())
    }

    async fn delete(&self, id: OperationId) -> Result<()> {
        self.inner.lock().unwrap().ops.remove(&id);
        Ok(())
    }
}

#[derive(Default)]
struct RemoteState {
    records: HashMap<(String, String), Payload>,
    failures: HashMap<String, RemoteError>,
    submissions: Vec<String>,
}

/// Remote store whose per-record outcome is scripted by identity.
#[derive(Default)]
pub struct ScriptedRemote {
    state: Mutex<RemoteState>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Fail every submission of the record with this identity.
    pub fn fail(&self, id: &str, err: RemoteError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(id.to_string(), err);
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    pub fn record(&self, table: &str, id: &str) -> Option<Payload> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(&(table.to_string(), id.to_string()))
            .cloned()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    /// Identities in submission order, including failed submissions.
    pub fn submissions(&self) -> Vec<String> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    async fn submit(
        &self,
        target: &TableName,
        payload: &Payload,
    ) -> std::result::Result<Payload, RemoteError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let mut state = self.state.lock().unwrap();
            match payload.identity_key("id") {
                None => Err(RemoteError::rejected("missing id")),
                Some(key) => {
                    state.submissions.push(key.clone());
                    match state.failures.get(&key) {
                        Some(err) => Err(err.clone()),
                        None => {
                            state
                                .records
                                .insert((target.to_string(), key), payload.clone());
                            Ok(payload.clone())
                        }
                    }
                }
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
