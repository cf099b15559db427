//! File-backed remote store.
//!
//! Stands in for the hosted backend during development and in tests. Each
//! record lives at `{root}/tables/{table}/{identity}.json`; submitting a
//! record with an existing identity merges its fields into the stored one,
//! the same resolution the hosted backend applies.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use domsync_core::error::{Error, InvalidInputError, RemoteError};
use domsync_core::traits::RemoteStore;
use domsync_core::types::{DEFAULT_IDENTITY_FIELD, Payload, RemoteUrl, TableName};

/// Longest identity stored as a file name, in bytes. Leaves room for the
/// `.json` suffix and the temp-file prefix under common 255-byte limits.
const MAX_IDENTITY_BYTES: usize = 200;

fn io_unavailable(context: &str, err: io::Error) -> RemoteError {
    RemoteError::unavailable(format!("{}: {}", context, err))
}

fn invalid_identity(message: String) -> RemoteError {
    RemoteError::Rejected {
        status: None,
        code: Some("invalid_identity".to_string()),
        message,
    }
}

/// A remote store kept in a local directory.
#[derive(Debug, Clone)]
pub struct FileRemote {
    root: PathBuf,
    identity_field: String,
}

impl FileRemote {
    /// Create a store rooted at `root`, keyed by the default identity field.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            identity_field: DEFAULT_IDENTITY_FIELD.to_string(),
        }
    }

    /// Create a store from a `file://` remote URL.
    pub fn from_url(url: &RemoteUrl) -> domsync_core::Result<Self> {
        let root = url.to_file_path().ok_or_else(|| {
            Error::InvalidInput(InvalidInputError::RemoteUrl {
                value: url.to_string(),
                reason: "not a file:// URL".to_string(),
            })
        })?;
        Ok(Self::new(root))
    }

    /// Key records by a different payload field.
    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_dir(&self, table: &TableName) -> PathBuf {
        self.root.join("tables").join(table.as_str())
    }

    fn record_path(&self, table: &TableName, key: &str) -> PathBuf {
        self.table_dir(table).join(format!("{}.json", key))
    }

    fn identity_of(&self, payload: &Payload) -> Result<String, RemoteError> {
        let key = payload.identity_key(&self.identity_field).ok_or_else(|| {
            RemoteError::Rejected {
                status: None,
                code: Some("missing_identity".to_string()),
                message: format!(
                    "payload has no usable '{}' field",
                    self.identity_field
                ),
            }
        })?;

        let unsafe_key = key.starts_with('.')
            || key.contains(['/', '\\', ':'])
            || key.chars().any(char::is_control);
        if unsafe_key {
            return Err(invalid_identity(format!("identity '{}' cannot be stored", key)));
        }
        if key.len() > MAX_IDENTITY_BYTES {
            return Err(invalid_identity(format!(
                "identity is {} bytes, longer than {}",
                key.len(),
                MAX_IDENTITY_BYTES
            )));
        }
        Ok(key)
    }

    /// Read a stored record.
    ///
    /// A record that no longer parses is reported as rejected with code
    /// `corrupt_record`.
    pub fn get(&self, table: &TableName, key: &str) -> Result<Option<Payload>, RemoteError> {
        let path = self.record_path(table, key);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_unavailable("cannot read record", e)),
        };
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| RemoteError::Rejected {
                status: None,
                code: Some("corrupt_record".to_string()),
                message: format!("corrupt record {}: {}", path.display(), e),
            })
    }

    /// The stored fields to merge into, if any. A corrupt record is replaced.
    fn existing_fields(&self, table: &TableName, key: &str) -> Result<Map<String, Value>, RemoteError> {
        match self.get(table, key) {
            Ok(Some(existing)) => match existing.into_value() {
                Value::Object(map) => Ok(map),
                _ => Ok(Map::new()),
            },
            Ok(None) => Ok(Map::new()),
            Err(RemoteError::Rejected { message, .. }) => {
                warn!(%key, %message, "Overwriting unreadable record");
                Ok(Map::new())
            }
            Err(e) => Err(e),
        }
    }

    /// All records in a table, ordered by identity.
    pub fn list(&self, table: &TableName) -> Result<Vec<Payload>, RemoteError> {
        let dir = self.table_dir(table);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys: Vec<String> = fs::read_dir(&dir)
            .map_err(|e| io_unavailable("cannot list table", e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        keys.sort();

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = self.get(table, &key)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl RemoteStore for FileRemote {
    #[instrument(skip(self, payload), fields(%target))]
    async fn submit(&self, target: &TableName, payload: &Payload) -> Result<Payload, RemoteError> {
        let key = self.identity_of(payload)?;

        let mut merged = self.existing_fields(target, &key)?;
        if let Value::Object(fields) = payload.as_value() {
            for (field, value) in fields {
                merged.insert(field.clone(), value.clone());
            }
        }
        let record = Payload::from_map(merged);

        let content = serde_json::to_vec_pretty(record.as_value())
            .map_err(|e| RemoteError::rejected(format!("cannot encode record: {}", e)))?;
        crate::atomic::write_atomic(&self.record_path(target, &key), &content)
            .map_err(|e| io_unavailable("cannot write record", e))?;

        debug!(%key, "Upserted record");
        Ok(record)
    }
}
