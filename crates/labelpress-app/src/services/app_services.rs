// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — opens the durable stores, loads settings, and
// builds the pipeline.
//
// Ledger and event log failures are fatal. Everything else degrades to a
// logged error.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use labelpress_core::Settings;
use labelpress_core::error::{LabelpressError, Result};
use labelpress_journal::{EventLog, Ledger};
use labelpress_print::{DispatchConfig, PrintDispatcher};
use tracing::{info, warn};

use super::data_dir;
use super::pipeline::Pipeline;
use super::remote::{ConnectionReport, RemoteSource};

const SETTINGS_FILE: &str = "settings.json";
const LEDGER_FILE: &str = "processed_files.txt";
const EVENT_LOG_FILE: &str = "labelpress.log";

/// Shared application services. Cheap to clone.
#[derive(Clone)]
pub struct AppServices {
    data_dir: PathBuf,
    settings: Arc<Mutex<Settings>>,
    ledger: Arc<Ledger>,
    events: Arc<EventLog>,
    dispatcher: Arc<PrintDispatcher>,
    remote: RemoteSource,
    pipeline: Arc<Pipeline>,
}

impl AppServices {
    /// Initialise all services in the resolved data directory.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn init() -> Result<Self> {
        Self::open_in(data_dir::data_dir(), DispatchConfig::default())
    }

    /// Initialise all services rooted at `dir`.
    pub fn open_in(dir: PathBuf, dispatch: DispatchConfig) -> Result<Self> {
        info!(path = %dir.display(), "initialising app services");

        let events = Arc::new(EventLog::open(dir.join(EVENT_LOG_FILE))?);
        let ledger = Arc::new(Ledger::load(dir.join(LEDGER_FILE))?);
        info!(
            ledger = %ledger.path().display(),
            event_log = %events.path().display(),
            "durable stores opened"
        );
        events.write(format!(
            "Loaded {} previously processed files.",
            ledger.len()
        ));

        let settings = load_settings(&dir).unwrap_or_default();
        let remote = RemoteSource::new()?;
        let dispatcher = Arc::new(PrintDispatcher::start(dispatch));
        let pipeline = Arc::new(Pipeline::new(
            remote.clone(),
            Arc::clone(&ledger),
            Arc::clone(&events),
            Arc::clone(&dispatcher),
        ));

        info!("app services initialised");
        Ok(Self {
            data_dir: dir,
            settings: Arc::new(Mutex::new(settings)),
            ledger,
            events,
            dispatcher,
            remote,
            pipeline,
        })
    }

    // -- Settings -------------------------------------------------------------

    /// Get a clone of the current settings.
    pub fn settings(&self) -> Settings {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Update and persist the settings.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = settings.clone();
        persist_settings(&self.data_dir, settings)
    }

    /// Re-read the settings file, replacing the in-memory copy.
    pub fn reload_settings(&self) -> Result<Settings> {
        let settings = read_settings(&self.data_dir)?;
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = settings.clone();
        Ok(settings)
    }

    // -- Pipeline ------------------------------------------------------------

    pub fn pipeline(&self) -> Arc<Pipeline> {
        Arc::clone(&self.pipeline)
    }

    pub fn events(&self) -> Arc<EventLog> {
        Arc::clone(&self.events)
    }

    /// Operator reset: forget every processed name.
    pub fn clear_ledger(&self) -> Result<usize> {
        let removed = self.ledger.len();
        self.ledger.clear()?;
        self.events
            .write(format!("Processed files list cleared ({removed} entries)."));
        Ok(removed)
    }

    /// Check the configured endpoint answers.
    pub async fn test_connection(&self) -> Result<ConnectionReport> {
        let settings = self.settings();
        self.events
            .write(format!("Testing connection to {}", settings.endpoint_url));
        match self
            .remote
            .test_connection(&settings.endpoint_url, &settings.caller_id)
            .await
        {
            Ok(report) => {
                self.events.write(format!(
                    "Connection OK - HTTP {} ({} bytes)",
                    report.status, report.body_len
                ));
                Ok(report)
            }
            Err(e) => {
                self.events.write(format!("Connection failed: {e}"));
                Err(e)
            }
        }
    }

    /// Flush staged print files. Call once before exit.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
        self.events.write("Labelpress stopped.");
    }

    /// Path to the data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

// -- Settings file persistence ------------------------------------------------

fn load_settings(data_dir: &Path) -> Option<Settings> {
    match read_settings(data_dir) {
        Ok(settings) => Some(settings),
        Err(LabelpressError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(error = %e, "settings file unreadable, using defaults");
            None
        }
    }
}

fn read_settings(data_dir: &Path) -> Result<Settings> {
    let data = std::fs::read_to_string(data_dir.join(SETTINGS_FILE))?;
    Ok(serde_json::from_str(&data)?)
}

fn persist_settings(data_dir: &Path, settings: &Settings) -> Result<()> {
    let path = data_dir.join(SETTINGS_FILE);
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(&path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelpress_core::types::ErrorClass;

    fn dispatch(dir: &Path) -> DispatchConfig {
        DispatchConfig {
            temp_dir: dir.join("tmp"),
            strategies: Vec::new(),
            ..DispatchConfig::default()
        }
    }

    #[tokio::test]
    async fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let services = AppServices::open_in(dir.path().to_path_buf(), dispatch(dir.path())).unwrap();
        assert_eq!(services.settings(), Settings::default());

        let updated = Settings {
            endpoint_url: "https://labels.example.test/pending".into(),
            caller_id: "station-7".into(),
            poll_interval_secs: 15,
            ..Settings::default()
        };
        services.save_settings(&updated).unwrap();
        services.shutdown().await;

        let reopened = AppServices::open_in(dir.path().to_path_buf(), dispatch(dir.path())).unwrap();
        assert_eq!(reopened.settings(), updated);
        reopened.shutdown().await;
    }

    #[tokio::test]
    async fn startup_reports_ledger_size() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LEDGER_FILE), "A.pdf\nB.pdf\n").unwrap();

        let services = AppServices::open_in(dir.path().to_path_buf(), dispatch(dir.path())).unwrap();
        let lines = services.events().read_all().unwrap();
        assert!(lines.iter().any(|l| l.ends_with("Loaded 2 previously processed files.")));

        assert_eq!(services.clear_ledger().unwrap(), 2);
        assert!(!dir.path().join(LEDGER_FILE).exists());
    }

    #[tokio::test]
    async fn stores_live_in_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let services = AppServices::open_in(dir.path().to_path_buf(), dispatch(dir.path())).unwrap();
        assert_eq!(services.ledger.path(), dir.path().join(LEDGER_FILE));
        assert_eq!(services.events().path(), dir.path().join(EVENT_LOG_FILE));
    }

    #[tokio::test]
    async fn unusable_data_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = AppServices::open_in(blocker.join("data"), dispatch(dir.path()))
            .err()
            .unwrap();
        assert_eq!(err.class(), ErrorClass::Fatal);
    }

    #[tokio::test]
    async fn reload_picks_up_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let services = AppServices::open_in(dir.path().to_path_buf(), dispatch(dir.path())).unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"caller_id":"station-9","poll_interval_secs":5}"#,
        )
        .unwrap();

        let reloaded = services.reload_settings().unwrap();
        assert_eq!(reloaded.caller_id, "station-9");
        assert_eq!(services.settings().poll_interval_secs, 5);
    }

    #[tokio::test]
    async fn corrupt_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();

        let services = AppServices::open_in(dir.path().to_path_buf(), dispatch(dir.path())).unwrap();
        assert_eq!(services.settings(), Settings::default());
    }
}
