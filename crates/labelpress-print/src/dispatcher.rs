// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print dispatcher — stage bytes in a temp file, try each strategy in turn,
// and hand the file to the cleaner.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use labelpress_core::error::{LabelpressError, Result};
use labelpress_core::types::DocumentFormat;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::cleanup::{CleanupConfig, TEMP_PREFIX, TempFileCleaner};
use crate::strategy::{PrintStrategy, StrategyKind, platform_defaults};

/// Dispatcher configuration. Defaults suit an unattended label station.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Where staged files are written. Defaults to the system temp dir.
    pub temp_dir: PathBuf,
    /// Attempted in order until one succeeds.
    pub strategies: Vec<PrintStrategy>,
    pub launch_wait: Duration,
    pub command_wait: Duration,
    pub cleanup: CleanupConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            strategies: platform_defaults(),
            launch_wait: Duration::from_secs(10),
            command_wait: Duration::from_secs(5),
            cleanup: CleanupConfig::default(),
        }
    }
}

/// What a successful dispatch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub staged_path: PathBuf,
    /// Name of the strategy that accepted the job.
    pub strategy: String,
}

pub struct PrintDispatcher {
    config: DispatchConfig,
    cleaner: Arc<TempFileCleaner>,
}

impl PrintDispatcher {
    /// Create the dispatcher and start its periodic temp sweep.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: DispatchConfig) -> Self {
        let cleaner = TempFileCleaner::new(config.temp_dir.clone(), config.cleanup.clone());
        cleaner.start_sweep();
        info!(
            temp_dir = %config.temp_dir.display(),
            strategies = config.strategies.len(),
            "print dispatcher started"
        );
        Self { config, cleaner }
    }

    pub fn cleaner(&self) -> &Arc<TempFileCleaner> {
        &self.cleaner
    }

    /// Send `bytes` to `device`.
    ///
    /// The staged file gets an extension matching `format`. Its deletion is
    /// scheduled whether or not printing succeeded. Strategy failures are
    /// collected into a single [`LabelpressError::DispatchFailed`].
    #[instrument(skip(self, bytes, format), fields(bytes_len = bytes.len(), format = %format))]
    pub async fn dispatch(
        &self,
        bytes: &[u8],
        format: DocumentFormat,
        device: &str,
    ) -> Result<DispatchReceipt> {
        let device = device.trim();
        if device.is_empty() {
            return Err(LabelpressError::NoPrinterSelected);
        }

        let staged_path = self.staging_path(format);
        tokio::fs::create_dir_all(&self.config.temp_dir).await?;
        tokio::fs::write(&staged_path, bytes).await?;
        self.cleaner.track(&staged_path);

        let outcome = self.try_strategies(device, &staged_path).await;
        self.cleaner.schedule_delete(staged_path.clone());

        let strategy = outcome?;
        info!(device, strategy = %strategy, "print job sent");
        Ok(DispatchReceipt {
            staged_path,
            strategy,
        })
    }

    /// Stop the sweep and remove every staged file still on disk.
    pub async fn shutdown(&self) {
        self.cleaner.shutdown().await;
        info!("print dispatcher stopped");
    }

    async fn try_strategies(&self, device: &str, file: &std::path::Path) -> Result<String> {
        let mut failures = Vec::with_capacity(self.config.strategies.len());
        for strategy in &self.config.strategies {
            let wait = match strategy.kind {
                StrategyKind::Launch => self.config.launch_wait,
                StrategyKind::Command => self.config.command_wait,
            };
            match strategy.run(device, file, wait).await {
                Ok(()) => return Ok(strategy.name.clone()),
                Err(e) => {
                    warn!(strategy = %strategy.name, error = %e, "print strategy failed");
                    failures.push(e.to_string());
                }
            }
        }

        let detail = if failures.is_empty() {
            "no print strategies configured".to_owned()
        } else {
            failures.join("; ")
        };
        Err(LabelpressError::DispatchFailed {
            device: device.to_owned(),
            detail,
        })
    }

    fn staging_path(&self, format: DocumentFormat) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f");
        self.config.temp_dir.join(format!(
            "{TEMP_PREFIX}{stamp}_{}.{}",
            Uuid::new_v4().simple(),
            format.extension()
        ))
    }
}
