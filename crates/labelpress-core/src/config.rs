// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application settings.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shortest polling interval the poller will honour.
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;

/// Persistent application settings.
///
/// The pipeline receives an immutable snapshot of this at the start of every
/// cycle; replacing it restarts the poll timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Remote endpoint returning pending labels.
    pub endpoint_url: String,
    /// Caller identifier sent as the `user_id` query parameter.
    pub caller_id: String,
    /// Seconds between poll cycles.
    pub poll_interval_secs: u64,
    /// Save finished documents to `save_path`.
    pub save_enabled: bool,
    /// Destination folder for finished documents.
    pub save_path: String,
    /// Send finished documents straight to `device_name`.
    pub print_enabled: bool,
    /// Target printer as known to the operating system.
    pub device_name: String,
    /// Wrap raster payloads into a one-page PDF before saving/printing.
    pub convert_images: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            caller_id: String::new(),
            poll_interval_secs: 30,
            save_enabled: false,
            save_path: String::new(),
            print_enabled: true,
            device_name: String::new(),
            convert_images: true,
        }
    }
}

impl Settings {
    /// Both the endpoint and the caller id are present.
    pub fn is_remote_configured(&self) -> bool {
        !self.endpoint_url.trim().is_empty() && !self.caller_id.trim().is_empty()
    }

    /// Poll interval, clamped to [`MIN_POLL_INTERVAL_SECS`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(MIN_POLL_INTERVAL_SECS))
    }

    /// Destination folder when saving is enabled and a path is set.
    pub fn save_target(&self) -> Option<&Path> {
        let trimmed = self.save_path.trim();
        (self.save_enabled && !trimmed.is_empty()).then(|| Path::new(trimmed))
    }

    /// Target device when direct printing is enabled.
    ///
    /// Returns `Some("")` when printing is on but no device was chosen, so the
    /// dispatcher can report it.
    pub fn print_target(&self) -> Option<&str> {
        self.print_enabled.then(|| self.device_name.trim())
    }
}
