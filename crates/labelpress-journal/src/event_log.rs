// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator event log — timestamped text journal with retention pruning.
//
// Line format: `[yyyy-MM-dd HH:mm:ss] message`, local time. A message that
// spans several lines is written verbatim; its continuation lines carry no
// timestamp and survive pruning only while the line before them survives.
//
// `write` is called from async tasks, so it only holds the lock for a single
// append. The periodic prune rewrites the whole file and runs on the blocking
// pool when a Tokio runtime is available.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime, TimeDelta};
use labelpress_core::error::{LabelpressError, Result};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

/// How long a line stays in the log, in hours.
pub const DEFAULT_RETENTION_HOURS: i64 = 2;

/// Minimum time between two pruning passes.
pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(5 * 60);

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Capacity of the subscriber channel. Slow subscribers lag rather than block.
const SUBSCRIBER_CAPACITY: usize = 256;

struct LogState {
    last_prune: Instant,
}

/// Append-only operator journal shared by every pipeline component.
pub struct EventLog {
    path: PathBuf,
    retention: TimeDelta,
    prune_interval: Duration,
    state: Arc<Mutex<LogState>>,
    sender: broadcast::Sender<String>,
}

impl EventLog {
    /// Open the log at `path` with the default two-hour retention.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_retention(
            path,
            TimeDelta::hours(DEFAULT_RETENTION_HOURS),
            DEFAULT_PRUNE_INTERVAL,
        )
    }

    /// Open the log at `path`, creating it if needed, and prune it once.
    ///
    /// Failure to create or read the file is [`LabelpressError::EventLog`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn with_retention(
        path: impl AsRef<Path>,
        retention: TimeDelta,
        prune_interval: Duration,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let to_err = |e: std::io::Error| LabelpressError::EventLog(format!("{}: {e}", path.display()));

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(to_err)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(to_err)?;

        let (sender, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        let log = Self {
            path: path.clone(),
            retention,
            prune_interval,
            state: Arc::new(Mutex::new(LogState {
                last_prune: Instant::now(),
            })),
            sender,
        };
        prune_file(&log.path, log.retention).map_err(to_err)?;
        info!("event log opened");
        Ok(log)
    }

    /// Append `message` with a timestamp and notify subscribers.
    ///
    /// A failed append is reported through `tracing` only; the caller's work
    /// is never interrupted by the journal.
    pub fn write(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        let line = format!("[{}] {message}", Local::now().format(TIMESTAMP_FORMAT));

        let prune_due = {
            let mut state = self.lock();
            if let Err(e) = self.append(&line) {
                warn!(error = %e, path = %self.path.display(), "event log append failed");
            }
            let due = state.last_prune.elapsed() >= self.prune_interval;
            if due {
                state.last_prune = Instant::now();
            }
            due
        };
        if prune_due {
            self.schedule_prune();
        }

        info!(target: "labelpress::events", "{message}");
        // No receivers is the normal headless case.
        let _ = self.sender.send(line);
    }

    /// Subscribe to every line written from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    /// Every retained line, oldest first. Prunes first if the interval has
    /// elapsed.
    pub fn read_all(&self) -> Result<Vec<String>> {
        let mut state = self.lock();
        if state.last_prune.elapsed() >= self.prune_interval {
            prune_file(&self.path, self.retention)?;
            state.last_prune = Instant::now();
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(contents.lines().map(String::from).collect())
    }

    /// The last `count` lines, oldest first.
    pub fn read_recent(&self, count: usize) -> Result<Vec<String>> {
        let mut lines = self.read_all()?;
        let skip = lines.len().saturating_sub(count);
        lines.drain(..skip);
        Ok(lines)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }

    /// Prune under the state lock, off the async worker threads if possible.
    fn schedule_prune(&self) {
        let state = Arc::clone(&self.state);
        let path = self.path.clone();
        let retention = self.retention;
        let job = move || {
            let _guard = state.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = prune_file(&path, retention) {
                warn!(error = %e, "event log prune failed");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => job(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Rewrite `path` without lines older than `retention`.
/// Callers must hold the state lock (or be the constructor).
fn prune_file(path: &Path, retention: TimeDelta) -> std::io::Result<()> {
    let contents = fs::read_to_string(path)?;
    let lines: Vec<&str> = contents.lines().collect();
    let cutoff = Local::now().naive_local() - retention;
    let kept = retain_recent(&lines, cutoff);

    if kept.len() != lines.len() {
        let mut body = kept.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        fs::write(path, body)?;
        debug!(removed = lines.len() - kept.len(), "event log pruned");
    }
    Ok(())
}

/// Keep lines stamped at or after `cutoff`.
///
/// A line without a parsable timestamp is kept only if the line immediately
/// before it was kept.
pub fn retain_recent(lines: &[&str], cutoff: NaiveDateTime) -> Vec<String> {
    let mut kept = Vec::with_capacity(lines.len());
    let mut previous_kept = false;
    for line in lines {
        let keep = match parse_timestamp(line) {
            Some(stamp) => stamp >= cutoff,
            None => previous_kept,
        };
        if keep {
            kept.push((*line).to_owned());
        }
        previous_kept = keep;
    }
    kept
}

fn parse_timestamp(line: &str) -> Option<NaiveDateTime> {
    let rest = line.strip_prefix('[')?;
    let (stamp, _) = rest.split_once(']')?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}
