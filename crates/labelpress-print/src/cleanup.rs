// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Temp-file cleanup — delayed deletion of staged print files plus a
// periodic sweep for anything left behind by a crash.
//
// All background work runs on one `TaskTracker`. Cancelling the token makes
// every pending delayed deletion run immediately and stops the sweep, so
// `shutdown` returns once the staging directory is as clean as it can be.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use labelpress_core::types::DocumentFormat;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

/// Filename prefix of every file this crate stages.
pub const TEMP_PREFIX: &str = "labelpress_";

/// Timing for deletion and sweeping.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Delay between dispatch and the first deletion attempt.
    pub delete_delay: Duration,
    /// Attempts per deletion; a spooler may still hold the file open.
    pub delete_attempts: u32,
    pub retry_pause: Duration,
    pub sweep_initial_delay: Duration,
    pub sweep_interval: Duration,
    /// Staged files older than this are removed by the sweep.
    pub max_age: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            delete_delay: Duration::from_secs(30),
            delete_attempts: 3,
            retry_pause: Duration::from_secs(1),
            sweep_initial_delay: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(30 * 60),
            max_age: Duration::from_secs(60 * 60),
        }
    }
}

pub struct TempFileCleaner {
    dir: PathBuf,
    config: CleanupConfig,
    tracked: Mutex<HashSet<PathBuf>>,
    tasks: TaskTracker,
    cancel: CancellationToken,
}

impl TempFileCleaner {
    pub fn new(dir: impl Into<PathBuf>, config: CleanupConfig) -> Arc<Self> {
        Arc::new(Self {
            dir: dir.into(),
            config,
            tracked: Mutex::new(HashSet::new()),
            tasks: TaskTracker::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Remember `path` so shutdown can remove it.
    pub fn track(&self, path: &Path) {
        self.lock().insert(path.to_path_buf());
    }

    /// Paths staged and not yet deleted.
    pub fn tracked(&self) -> Vec<PathBuf> {
        self.lock().iter().cloned().collect()
    }

    /// Delete `path` after the configured delay, or immediately on shutdown.
    pub fn schedule_delete(self: &Arc<Self>, path: PathBuf) {
        let this = Arc::clone(self);
        self.tasks.spawn(async move {
            tokio::select! {
                _ = this.cancel.cancelled() => {}
                _ = tokio::time::sleep(this.config.delete_delay) => {}
            }
            this.delete_with_retries(&path).await;
        });
    }

    /// Start the periodic sweep. Must be called from within a runtime.
    pub fn start_sweep(self: &Arc<Self>) {
        let this = Arc::clone(self);
        self.tasks.spawn(async move {
            let mut delay = this.config.sweep_initial_delay;
            loop {
                tokio::select! {
                    _ = this.cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                let removed = this.sweep().await;
                if removed > 0 {
                    info!(removed, "swept stale print files");
                }
                delay = this.config.sweep_interval;
            }
            debug!("temp sweep stopped");
        });
    }

    /// Try to delete `path`, pausing between attempts. A file that is already
    /// gone counts as deleted.
    pub async fn delete_with_retries(&self, path: &Path) -> bool {
        let attempts = self.config.delete_attempts.max(1);
        for attempt in 1..=attempts {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {
                    debug!(path = %path.display(), attempt, "temp file deleted");
                    self.lock().remove(path);
                    return true;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    self.lock().remove(path);
                    return true;
                }
                Err(e) if attempt < attempts => {
                    debug!(path = %path.display(), attempt, error = %e, "temp file busy, retrying");
                    tokio::time::sleep(self.config.retry_pause).await;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not delete temp file");
                }
            }
        }
        false
    }

    /// Remove staged files older than `max_age`. Returns how many went.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub async fn sweep(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "could not scan temp directory");
                return 0;
            }
        };

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "temp directory scan interrupted");
                    break;
                }
            };
            let path = entry.path();
            if !is_staged_file(&path) || !self.is_expired(&entry).await {
                continue;
            }
            if self.delete_with_retries(&path).await {
                removed += 1;
            }
        }

        self.lock().retain(|p| p.exists());
        removed
    }

    /// Cancel pending work, wait for it, then delete anything still tracked.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;

        for path in self.tracked() {
            self.delete_with_retries(&path).await;
        }
        let left = self.lock().len();
        if left > 0 {
            warn!(left, "temp files could not be removed at shutdown");
        }
    }

    async fn is_expired(&self, entry: &tokio::fs::DirEntry) -> bool {
        let Ok(meta) = entry.metadata().await else {
            return false;
        };
        let Ok(modified) = meta.modified() else {
            return false;
        };
        SystemTime::now()
            .duration_since(modified)
            .is_ok_and(|age| age >= self.config.max_age)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Whether `path` looks like something this crate staged.
pub fn is_staged_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    name.starts_with(TEMP_PREFIX)
        && DocumentFormat::staging_extensions()
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
}
