//! Network signal read from a status file.
//!
//! A platform helper (a NetworkManager dispatcher script, a systemd unit, a
//! test) writes `online` or `offline` into a file. The signal watches the
//! file with `notify` and also polls it, since some filesystems do not
//! deliver change events.

use std::fs;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use domsync_core::Result;
use domsync_core::error::{Error, InvalidInputError};
use domsync_core::traits::NetworkSignal;
use domsync_core::types::Connectivity;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Read a status file. Missing or unrecognized content yields `None`.
pub fn read_status(path: &Path) -> Option<Connectivity> {
    let content = fs::read_to_string(path).ok()?;
    let status = Connectivity::parse(&content);
    if status.is_none() {
        warn!(path = %path.display(), "Unrecognized network status");
    }
    status
}

/// Sends the file's status whenever it differs from the last one sent.
struct Reporter {
    path: PathBuf,
    last: Mutex<Option<Connectivity>>,
    tx: mpsc::UnboundedSender<Connectivity>,
}

impl Reporter {
    /// Returns false once the receiving side is gone.
    fn report(&self) -> bool {
        if self.tx.is_closed() {
            return false;
        }
        let Some(status) = read_status(&self.path) else {
            return true;
        };

        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if *last == Some(status) {
            return true;
        }
        *last = Some(status);
        debug!(%status, "Network status file changed");
        self.tx.send(status).is_ok()
    }
}

/// A [`NetworkSignal`] backed by a status file.
pub struct FileSignal {
    inner: Pin<Box<dyn Stream<Item = Connectivity> + Send>>,
    initial: Option<Connectivity>,
}

impl FileSignal {
    /// Watch `path` with the default poll interval.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn watch(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_poll_interval(path, DEFAULT_POLL_INTERVAL)
    }

    /// Watch `path`, re-reading it at least every `interval`.
    ///
    /// The file's current content is read synchronously and reported as the
    /// initial value. The file may be absent; the directory containing it
    /// must exist.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn with_poll_interval(path: impl AsRef<Path>, interval: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(|n| n.to_os_string()).ok_or_else(|| {
            Error::InvalidInput(InvalidInputError::Other {
                message: format!("Signal path has no file name: {}", path.display()),
            })
        })?;

        let initial = read_status(&path);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = Arc::new(Reporter {
            path: path.clone(),
            last: Mutex::new(initial),
            tx,
        });

        let watch_reporter = reporter.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                if !matches!(
                    event.kind,
                    notify::EventKind::Modify(_) | notify::EventKind::Create(_)
                ) {
                    return;
                }
                if event.paths.iter().any(|p| p.file_name() == Some(file_name.as_os_str())) {
                    watch_reporter.report();
                }
            }
        })
        .map_err(|e| {
            Error::InvalidInput(InvalidInputError::Other {
                message: format!("Failed to create file watcher: {}", e),
            })
        })?;

        watcher.watch(&dir, RecursiveMode::NonRecursive).map_err(|e| {
            Error::InvalidInput(InvalidInputError::Other {
                message: format!("Failed to watch {}: {}", dir.display(), e),
            })
        })?;

        tokio::spawn(async move {
            let _watcher = watcher;
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if !reporter.report() {
                    break;
                }
            }
            debug!(path = %reporter.path.display(), "Network status watch stopped");
        });

        let stream = async_stream::stream! {
            while let Some(status) = rx.recv().await {
                yield status;
            }
        };

        Ok(Self {
            inner: Box::pin(stream),
            initial,
        })
    }
}

impl Stream for FileSignal {
    type Item = Connectivity;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl NetworkSignal for FileSignal {
    fn initial(&self) -> Option<Connectivity> {
        self.initial
    }
}
