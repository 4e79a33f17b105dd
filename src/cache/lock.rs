//! Lock markers for in-flight computations
//!
//! A lock marker is an empty file created with `O_EXCL` semantics next to the
//! entry it guards. Whoever creates it owns the computation for that key;
//! everyone else waits for it to disappear. Because the marker is a plain
//! file, the exclusion holds across every process sharing the directory.

use notify::{Event, RecursiveMode, Watcher};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Cap on the back-off between lock release attempts
const RELEASE_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Attempts made from `Drop` when a marker was never released explicitly
const DROP_RELEASE_ATTEMPTS: u32 = 5;

/// Ownership of one lock marker file.
///
/// Call [`LockMarker::release`] when the computation finishes. If the owning
/// future is dropped first, `Drop` removes the marker on a best-effort basis.
#[derive(Debug)]
pub struct LockMarker {
    path: PathBuf,
    released: bool,
}

impl LockMarker {
    /// Atomically create the marker at `path`.
    ///
    /// Returns `Ok(None)` when another owner already holds it.
    pub async fn try_acquire(path: &Path) -> io::Result<Option<Self>> {
        let created = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await;

        match created {
            Ok(_) => Ok(Some(Self {
                path: path.to_path_buf(),
                released: false,
            })),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the marker, retrying until it is gone.
    ///
    /// A marker left behind would stall every later request for the key, so
    /// transient failures are retried with back-off and never abandoned.
    pub async fn release(mut self) {
        let mut attempt: u32 = 0;
        loop {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::NotFound => break,
                Err(e) => {
                    attempt += 1;
                    warn!(
                        path = %self.path.display(),
                        attempt,
                        error = %e,
                        "Unable to delete lock marker"
                    );
                    let backoff = Duration::from_millis(10 * u64::from(attempt.min(100)));
                    tokio::time::sleep(backoff.min(RELEASE_BACKOFF_MAX)).await;
                }
            }
        }
        self.released = true;
    }
}

impl Drop for LockMarker {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        for attempt in 1..=DROP_RELEASE_ATTEMPTS {
            match std::fs::remove_file(&self.path) {
                Ok(()) => return,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return,
                Err(e) => warn!(
                    path = %self.path.display(),
                    attempt,
                    error = %e,
                    "Unable to delete abandoned lock marker"
                ),
            }
        }
    }
}

/// How a wait for a marker's removal ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The marker is gone (or was gone before the wait began)
    Removed,
    /// The marker was still present when the wait bound elapsed
    TimedOut,
}

/// Wait until nothing exists at `path`, or `timeout` elapses.
///
/// Filesystem change notifications wake the wait early where the platform
/// supports them; otherwise, and as a backstop for missed events, existence
/// is re-checked every `poll_interval`. The check runs after the watcher is
/// installed, so a marker deleted in between is never missed.
pub async fn wait_for_removal(path: &Path, poll_interval: Duration, timeout: Duration) -> WaitOutcome {
    let (tx, mut rx) = mpsc::unbounded_channel();
    // Keeps `recv` pending (rather than closed) when no watcher could be set up
    let _keepalive = tx.clone();
    let _watcher = watch_for_changes(path, tx);

    let deadline = deadline_after(timeout);
    loop {
        if !exists(path).await {
            return WaitOutcome::Removed;
        }

        let now = Instant::now();
        if now >= deadline {
            return WaitOutcome::TimedOut;
        }

        let tick = poll_interval.min(deadline - now);
        // Either outcome leads back to the existence check
        let _ = tokio::time::timeout(tick, rx.recv()).await;
    }
}

/// `now + timeout`, saturating at a deadline decades away instead of
/// overflowing `Instant`
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}

async fn exists(path: &Path) -> bool {
    matches!(tokio::fs::try_exists(path).await, Ok(true))
}

/// Watch the parent directory for events touching `path`'s filename
fn watch_for_changes(
    path: &Path,
    tx: mpsc::UnboundedSender<()>,
) -> Option<notify::RecommendedWatcher> {
    let dir = path.parent()?;
    let name = path.file_name()?.to_os_string();

    let handler = move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            if event.paths.iter().any(|p| p.file_name() == Some(name.as_os_str())) {
                let _ = tx.send(());
            }
        }
    };

    let mut watcher = match notify::recommended_watcher(handler) {
        Ok(watcher) => watcher,
        Err(e) => {
            debug!(error = %e, "File watcher unavailable, polling instead");
            return None;
        }
    };

    if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
        debug!(dir = %dir.display(), error = %e, "Cannot watch directory, polling instead");
        return None;
    }

    Some(watcher)
}
