// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Poller — drives the pipeline from a single recurring timer.
//
// The loop owns the timer and the current settings snapshot. Settings
// replacement resets the timer; pause suppresses timer ticks but not manual
// triggers; cancellation lets an in-flight cycle finish before exiting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use labelpress_core::Settings;
use labelpress_journal::EventLog;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::pipeline::{CycleOutcome, Pipeline};

/// Control surface for a running poll loop.
pub struct PollerHandle {
    settings: watch::Sender<Settings>,
    paused: Arc<AtomicBool>,
    trigger: Arc<Notify>,
    cancel: CancellationToken,
    events: Arc<EventLog>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollerHandle {
    /// Start polling with `settings`. The first cycle runs immediately.
    pub fn spawn(pipeline: Arc<Pipeline>, events: Arc<EventLog>, settings: Settings) -> Self {
        let interval_secs = settings.poll_interval().as_secs();
        let (tx, rx) = watch::channel(settings);
        let paused = Arc::new(AtomicBool::new(false));
        let trigger = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(poll_loop(
            pipeline,
            rx,
            Arc::clone(&paused),
            Arc::clone(&trigger),
            cancel.clone(),
        ));
        events.write(format!("Polling started - Interval: {interval_secs}s"));

        Self {
            settings: tx,
            paused,
            trigger,
            cancel,
            events,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            self.events.write("Polling paused");
        }
    }

    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            self.events.write("Polling resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Run one cycle as soon as the loop is free, even while paused.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Replace the settings snapshot and restart the timer.
    pub fn update_settings(&self, settings: Settings) {
        let secs = settings.poll_interval().as_secs();
        self.settings.send_replace(settings);
        if self.is_paused() {
            self.events
                .write(format!("Timer updated - Interval: {secs}s (paused)"));
        } else {
            self.events
                .write(format!("Polling restarted - Interval: {secs}s"));
        }
    }

    /// The snapshot the next cycle will use.
    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    /// Stop the loop and wait for any in-flight cycle to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "poll loop panicked");
            }
        }
        self.events.write("Polling stopped");
    }
}

fn timer(settings: &Settings) -> Interval {
    let mut interval = tokio::time::interval(settings.poll_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn poll_loop(
    pipeline: Arc<Pipeline>,
    mut settings: watch::Receiver<Settings>,
    paused: Arc<AtomicBool>,
    trigger: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut interval = timer(&settings.borrow_and_update());

    loop {
        let run = tokio::select! {
            _ = cancel.cancelled() => break,
            changed = settings.changed() => {
                if changed.is_err() {
                    break;
                }
                interval = timer(&settings.borrow_and_update());
                // Restarted timers fire immediately; that tick decides.
                false
            }
            _ = trigger.notified() => true,
            _ = interval.tick() => !paused.load(Ordering::SeqCst),
        };

        if !run {
            continue;
        }
        let snapshot = settings.borrow().clone();
        match pipeline.run_cycle(&snapshot).await {
            CycleOutcome::Completed(summary) => debug!(%summary, "cycle finished"),
            other => debug!(outcome = ?other, "cycle ended early"),
        }
    }
    info!("poll loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::remote::RemoteSource;
    use labelpress_journal::Ledger;
    use labelpress_print::{DispatchConfig, PrintDispatcher};
    use std::time::Duration;

    fn harness(dir: &std::path::Path) -> (Arc<Pipeline>, Arc<EventLog>) {
        let ledger = Arc::new(Ledger::load(dir.join("processed_files.txt")).unwrap());
        let events = Arc::new(EventLog::open(dir.join("labelpress.log")).unwrap());
        let dispatcher = Arc::new(PrintDispatcher::start(DispatchConfig {
            temp_dir: dir.join("tmp"),
            strategies: Vec::new(),
            ..DispatchConfig::default()
        }));
        let pipeline = Arc::new(Pipeline::new(
            RemoteSource::new().unwrap(),
            ledger,
            Arc::clone(&events),
            dispatcher,
        ));
        (pipeline, events)
    }

    fn count(events: &EventLog, needle: &str) -> usize {
        events
            .read_all()
            .unwrap()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }

    #[tokio::test]
    async fn first_tick_runs_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, events) = harness(dir.path());

        // Unconfigured settings make each cycle log one recognisable line.
        let handle = PollerHandle::spawn(pipeline, Arc::clone(&events), Settings::default());
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.shutdown().await;

        assert_eq!(count(&events, "not configured"), 1);
        assert_eq!(count(&events, "Polling stopped"), 1);
    }

    #[tokio::test]
    async fn trigger_runs_while_paused() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, events) = harness(dir.path());

        let handle = PollerHandle::spawn(pipeline, Arc::clone(&events), Settings::default());
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.pause();
        assert!(handle.is_paused());

        handle.trigger();
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.shutdown().await;

        assert_eq!(count(&events, "not configured"), 2);
        assert_eq!(count(&events, "Polling paused"), 1);
    }

    #[tokio::test]
    async fn settings_update_reports_interval() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, events) = harness(dir.path());
        let handle = PollerHandle::spawn(pipeline, Arc::clone(&events), Settings::default());

        handle.pause();
        handle.update_settings(Settings {
            poll_interval_secs: 7,
            ..Settings::default()
        });
        assert_eq!(count(&events, "Timer updated - Interval: 7s (paused)"), 1);

        handle.resume();
        handle.update_settings(Settings {
            poll_interval_secs: 12,
            ..Settings::default()
        });
        assert_eq!(count(&events, "Polling restarted - Interval: 12s"), 1);
        assert_eq!(handle.settings().poll_interval_secs, 12);
        assert_eq!(count(&events, "Polling resumed"), 1);

        handle.shutdown().await;
    }
}
