//! Memoizing cache store
//!
//! `get_or_compute` is an explicit bounded retry loop:
//!
//! 1. Wait for any lock marker on the key to disappear.
//! 2. Serve the entry if it is fresh.
//! 3. Otherwise race to create the lock marker; the winner computes and
//!    commits, losers go back to step 1.
//!
//! Every unsuccessful iteration (lost race, timed-out wait, unreadable entry)
//! bumps a per-call failure counter. Once it reaches the configured bound the
//! store stops coordinating and calls the computation directly.

use super::keys;
use super::lock::{wait_for_removal, LockMarker, WaitOutcome};
use crate::error::{ScarletError, ScarletResult};
use chrono::{DateTime, Utc};
use filetime::FileTime;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Tuning for the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Unsuccessful iterations tolerated before bypassing the cache
    pub max_failures: u32,
    /// Upper bound on a single wait for a lock marker
    pub lock_wait: Duration,
    /// Existence re-check interval while waiting
    pub poll_interval: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_failures: 10,
            lock_wait: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// A committed entry as seen by maintenance commands
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    pub key: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// A computation for this key is in flight
    pub locked: bool,
}

enum Lookup {
    Fresh(Vec<u8>),
    Expired,
    Missing,
    /// Vanished or unreadable mid-lookup; the attempt is discarded
    Unreadable,
}

/// Disk-backed memoizing cache shared by every process using `dir`
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    options: CacheOptions,
}

impl CacheStore {
    /// Open the store with default options
    pub async fn open(dir: impl AsRef<Path>) -> ScarletResult<Self> {
        Self::with_options(dir, CacheOptions::default()).await
    }

    /// Open the store, creating the directory and sweeping leftovers.
    ///
    /// Lock markers and staging files present at this point belong to
    /// computations that can no longer finish, so they are deleted.
    pub async fn with_options(dir: impl AsRef<Path>, options: CacheOptions) -> ScarletResult<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ScarletError::io(format!("creating cache dir {}", dir.display()), e))?;
        let dir = tokio::fs::canonicalize(dir)
            .await
            .map_err(|e| ScarletError::io(format!("resolving cache dir {}", dir.display()), e))?;

        let store = Self { dir, options };
        let swept = store.sweep().await?;
        if swept > 0 {
            info!(dir = %store.dir.display(), swept, "Removed leftover lock and staging files");
        }
        Ok(store)
    }

    /// Use an existing directory without sweeping it.
    ///
    /// For maintenance commands that run beside live processes, whose lock
    /// markers must survive.
    pub fn attach(dir: impl Into<PathBuf>, options: CacheOptions) -> Self {
        Self {
            dir: dir.into(),
            options,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Path of the entry file for `key`
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(keys::entry_file_name(key))
    }

    /// Path of the lock marker for `key`
    pub fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(keys::lock_file_name(&keys::entry_file_name(key)))
    }

    /// Return the cached bytes for `key`, computing them at most once across
    /// all cooperating processes when no fresh entry exists.
    ///
    /// Filesystem trouble never escapes: the only error returned is the
    /// computation's own, and only when no entry (even an expired one) exists
    /// to serve instead.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        mut compute: F,
    ) -> Result<Vec<u8>, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
        E: fmt::Display,
    {
        let entry = self.entry_path(key);
        let lock = self.lock_path(key);
        let mut failures: u32 = 0;

        loop {
            if failures >= self.options.max_failures {
                warn!(key = %key, failures, "Cache retry bound reached, computing without lock");
                return self.bypass(key, &entry, &mut compute).await;
            }

            if exists(&lock).await {
                debug!(key = %key, "Waiting for in-flight computation");
                let outcome =
                    wait_for_removal(&lock, self.options.poll_interval, self.options.lock_wait)
                        .await;
                if outcome == WaitOutcome::TimedOut {
                    debug!(key = %key, failures, "Lock wait timed out");
                    failures += 1;
                    continue;
                }
            }

            match lookup(&entry, ttl).await {
                Lookup::Fresh(bytes) => return Ok(bytes),
                Lookup::Unreadable => {
                    failures += 1;
                    continue;
                }
                Lookup::Expired | Lookup::Missing => {}
            }

            match LockMarker::try_acquire(&lock).await {
                Ok(Some(marker)) => {
                    // Another owner may have committed between lookup and acquire
                    if let Lookup::Fresh(bytes) = lookup(&entry, ttl).await {
                        marker.release().await;
                        return Ok(bytes);
                    }
                    return self.compute_locked(key, &entry, marker, &mut compute).await;
                }
                Ok(None) => {
                    debug!(key = %key, "Lost lock race");
                    failures += 1;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Unable to create lock marker");
                    failures += 1;
                }
            }
        }
    }

    async fn compute_locked<F, Fut, E>(
        &self,
        key: &str,
        entry: &Path,
        marker: LockMarker,
        compute: &mut F,
    ) -> Result<Vec<u8>, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
        E: fmt::Display,
    {
        match compute().await {
            Ok(bytes) => {
                if let Err(e) = self.commit(entry, &bytes).await {
                    warn!(key = %key, error = %e, "Unable to commit cache entry");
                }
                marker.release().await;
                Ok(bytes)
            }
            Err(err) => {
                let stale = read_any(entry).await;
                marker.release().await;
                match stale {
                    Some(bytes) => {
                        warn!(key = %key, error = %err, "Computation failed, serving stale entry");
                        Ok(bytes)
                    }
                    None => Err(err),
                }
            }
        }
    }

    async fn bypass<F, Fut, E>(&self, key: &str, entry: &Path, compute: &mut F) -> Result<Vec<u8>, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
        E: fmt::Display,
    {
        match compute().await {
            Ok(bytes) => Ok(bytes),
            Err(err) => match read_any(entry).await {
                Some(bytes) => {
                    warn!(key = %key, error = %err, "Computation failed, serving stale entry");
                    Ok(bytes)
                }
                None => Err(err),
            },
        }
    }

    /// Write `bytes` to a staging file and rename it over the entry.
    ///
    /// The rename replaces the previous file, so the entry's timestamp is
    /// reset and readers only ever see whole entries.
    async fn commit(&self, entry: &Path, bytes: &[u8]) -> io::Result<()> {
        let entry_name = entry
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "entry path has no name"))?;
        let staging = self.dir.join(keys::staging_file_name(entry_name));

        if let Err(e) = tokio::fs::write(&staging, bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&staging, entry).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e);
        }
        Ok(())
    }

    /// Mark the entry for `key` as expired without deleting it.
    ///
    /// The old bytes stay available as a stale fallback until a new value is
    /// committed.
    pub async fn invalidate(&self, key: &str) -> ScarletResult<()> {
        let entry = self.entry_path(key);
        let target = entry.clone();
        let result =
            tokio::task::spawn_blocking(move || filetime::set_file_mtime(&target, FileTime::zero()))
                .await
                .map_err(|e| ScarletError::Internal(format!("invalidate task failed: {}", e)))?;

        match result {
            Ok(()) => {
                debug!(key = %key, "Invalidated cache entry");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ScarletError::io(
                format!("invalidating {}", entry.display()),
                e,
            )),
        }
    }

    /// Committed entries, sorted by key
    pub async fn entries(&self) -> ScarletResult<Vec<CacheEntryInfo>> {
        Ok(self.scan().await?.into_iter().map(|(_, info)| info).collect())
    }

    /// Remove every entry that is not being recomputed, returning the count
    pub async fn clear(&self) -> ScarletResult<usize> {
        let mut removed = 0;
        for (path, info) in self.scan().await? {
            if info.locked {
                debug!(key = %info.key, "Skipping locked entry");
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ScarletError::io(format!("removing entry {}", info.key), e));
                }
            }
        }
        Ok(removed)
    }

    /// Entry files with their listing info, sorted by key
    async fn scan(&self) -> ScarletResult<Vec<(PathBuf, CacheEntryInfo)>> {
        let mut out = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| ScarletError::io(format!("reading {}", self.dir.display()), e))?;

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| ScarletError::io(format!("reading {}", self.dir.display()), e))?
        {
            let name = item.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(key) = keys::listing_key(name) else {
                continue;
            };
            // Entries may vanish while listing
            let Ok(meta) = item.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let modified = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| DateTime::<Utc>::from(SystemTime::UNIX_EPOCH));
            let locked = exists(&self.dir.join(keys::lock_file_name(name))).await;

            out.push((
                item.path(),
                CacheEntryInfo {
                    key,
                    size: meta.len(),
                    modified,
                    locked,
                },
            ));
        }

        out.sort_by(|a, b| a.1.key.cmp(&b.1.key));
        Ok(out)
    }

    async fn sweep(&self) -> ScarletResult<usize> {
        let mut swept = 0;
        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| ScarletError::io(format!("reading {}", self.dir.display()), e))?;

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| ScarletError::io(format!("reading {}", self.dir.display()), e))?
        {
            let name = item.file_name();
            if !name.to_str().is_some_and(keys::is_transient) {
                continue;
            }
            match tokio::fs::remove_file(item.path()).await {
                Ok(()) => swept += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ScarletError::io(
                        format!("removing leftover {}", item.path().display()),
                        e,
                    ));
                }
            }
        }
        Ok(swept)
    }
}

async fn exists(path: &Path) -> bool {
    matches!(tokio::fs::try_exists(path).await, Ok(true))
}

/// An mtime in the future counts as fresh
fn is_fresh(modified: SystemTime, ttl: Duration) -> bool {
    match SystemTime::now().duration_since(modified) {
        Ok(age) => age <= ttl,
        Err(_) => true,
    }
}

async fn lookup(entry: &Path, ttl: Duration) -> Lookup {
    let meta = match tokio::fs::metadata(entry).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Lookup::Missing,
        Err(_) => return Lookup::Unreadable,
    };
    if !meta.is_file() {
        return Lookup::Unreadable;
    }
    let Ok(modified) = meta.modified() else {
        return Lookup::Unreadable;
    };
    if !is_fresh(modified, ttl) {
        return Lookup::Expired;
    }
    match tokio::fs::read(entry).await {
        Ok(bytes) => Lookup::Fresh(bytes),
        Err(_) => Lookup::Unreadable,
    }
}

/// Entry bytes regardless of age
async fn read_any(entry: &Path) -> Option<Vec<u8>> {
    tokio::fs::read(entry).await.ok()
}
