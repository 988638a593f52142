// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dedup ledger — flat append-only file of canonical document names.
//
// Format: one name per line, UTF-8, in the casing it was delivered with.
// Blank lines are ignored on load. The whole file is read into memory at
// startup; afterwards only appends happen until an operator clears it.
//
// Names are compared case-insensitively: `Report.PDF` and `report.pdf` are the
// same document, as they are the same file on case-insensitive filesystems.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use labelpress_core::error::{LabelpressError, Result};
use tracing::{debug, info, instrument};

/// Persistent set of names that have already been accepted.
///
/// All mutations take the same lock, so `record` calls from concurrent tasks
/// never interleave their appends.
pub struct Ledger {
    path: PathBuf,
    names: Mutex<HashSet<String>>,
}

impl Ledger {
    /// Load the ledger at `path`, creating its parent directory if needed.
    ///
    /// A missing file yields an empty ledger. Any other failure (unreadable
    /// file, unwritable directory) is returned as [`LabelpressError::Ledger`]
    /// and must stop the service.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| LabelpressError::Ledger(format!("{}: {e}", parent.display())))?;
        }

        let names: HashSet<String> = match fs::read_to_string(&path) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(fold)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                return Err(LabelpressError::Ledger(format!("{}: {e}", path.display())));
            }
        };

        // Probe that appends will succeed before the first cycle needs them.
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LabelpressError::Ledger(format!("{}: {e}", path.display())))?;

        info!(count = names.len(), "ledger loaded");
        Ok(Self {
            path,
            names: Mutex::new(names),
        })
    }

    /// Whether `name`, in any casing, has already been accepted.
    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains(&fold(name))
    }

    /// Record `name` as accepted.
    ///
    /// Returns `Ok(false)` when the name was already present. The in-memory
    /// set is updated before the append, so an I/O error still prevents the
    /// same name from being reprocessed for the lifetime of this process.
    #[instrument(skip(self))]
    pub fn record(&self, name: &str) -> Result<bool> {
        if name.contains(['\n', '\r']) {
            return Err(LabelpressError::InvalidEntry(format!(
                "name contains a line break: {name:?}"
            )));
        }

        let mut names = self.lock();
        if !names.insert(fold(name)) {
            return Ok(false);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{name}")?;
        debug!("ledger entry appended");
        Ok(true)
    }

    /// Forget every recorded name and delete the backing file.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<()> {
        let mut names = self.lock();
        let removed = names.len();
        names.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!(removed, "ledger cleared");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Key under which `name` is held in memory.
fn fold(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::load(dir.path().join("processed_files.txt")).unwrap();
        assert!(ledger.is_empty());
        assert!(!ledger.contains("INV001.pdf"));
    }

    #[test]
    fn load_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_files.txt");
        fs::write(&path, "INV001.pdf\n\n   \nlabel7.pdf\n").unwrap();

        let ledger = Ledger::load(&path).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains("INV001.pdf"));
        assert!(ledger.contains("label7.pdf"));
    }

    #[test]
    fn record_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("processed_files.txt");

        let ledger = Ledger::load(&path).unwrap();
        assert!(ledger.record("INV001.pdf").unwrap());
        assert!(!ledger.record("INV001.pdf").unwrap());
        drop(ledger);

        let reloaded = Ledger::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.contains("INV001.pdf"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "INV001.pdf\n");
    }

    #[test]
    fn names_match_in_any_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_files.txt");
        fs::write(&path, "Report.PDF\n").unwrap();

        let ledger = Ledger::load(&path).unwrap();
        assert!(ledger.contains("report.pdf"));
        assert!(ledger.contains("REPORT.pdf"));
        assert!(!ledger.record("report.pdf").unwrap());

        assert!(ledger.record("Label7.pdf").unwrap());
        assert!(ledger.contains("label7.PDF"));
        // The file keeps the delivered casing.
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Report.PDF\nLabel7.pdf\n"
        );
    }

    #[test]
    fn record_rejects_line_breaks() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::load(dir.path().join("l.txt")).unwrap();
        assert!(ledger.record("a\nb.pdf").is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn clear_removes_file_and_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_files.txt");
        let ledger = Ledger::load(&path).unwrap();
        ledger.record("INV001.pdf").unwrap();

        ledger.clear().unwrap();
        assert!(ledger.is_empty());
        assert!(!path.exists());

        // Recording after a clear recreates the file.
        ledger.record("INV002.pdf").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "INV002.pdf\n");
    }
}
