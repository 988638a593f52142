// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document store — collision-safe persistence into the destination folder.
//
// Collision policy:
//   - no file with that name          -> write it
//   - same name, same byte length     -> already saved, nothing to do
//   - same name, different length     -> write `{stem}_{yyyyMMdd_HHmmss_fff}.{ext}`
//
// Every write is verified by re-reading the file length.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use labelpress_core::error::{LabelpressError, Result};
use tracing::{debug, info, instrument, warn};

/// Result of a successful [`DocumentStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Bytes were written to this path.
    Saved(PathBuf),
    /// A file of identical name and length already exists here.
    AlreadyPresent(PathBuf),
}

impl SaveOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Saved(p) | Self::AlreadyPresent(p) => p,
        }
    }
}

/// A destination folder for finished documents.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `bytes` as `name` inside the store's folder.
    ///
    /// The folder is created if it does not exist. Path separators in `name`
    /// are replaced so a document can never escape the folder.
    #[instrument(skip(self, bytes), fields(root = %self.root.display(), bytes_len = bytes.len()))]
    pub fn save(&self, name: &str, bytes: &[u8]) -> Result<SaveOutcome> {
        if bytes.is_empty() {
            return Err(LabelpressError::InvalidEntry(format!(
                "refusing to save empty document {name}"
            )));
        }
        if self.root.as_os_str().is_empty() {
            return Err(LabelpressError::NoDestination);
        }

        fs::create_dir_all(&self.root)?;

        let file_name = sanitize_file_name(name);
        let mut target = self.root.join(&file_name);

        if let Ok(existing) = fs::metadata(&target) {
            if existing.len() == bytes.len() as u64 {
                info!(path = %target.display(), "File already exists with same size, skipping");
                return Ok(SaveOutcome::AlreadyPresent(target));
            }
            target = self.unique_path(&file_name);
            warn!(
                existing_len = existing.len(),
                path = %target.display(),
                "File exists with different size, saving under a timestamped name"
            );
        }

        fs::write(&target, bytes)?;

        let written = fs::metadata(&target)?.len();
        if written != bytes.len() as u64 {
            return Err(LabelpressError::VerificationFailed {
                path: target.display().to_string(),
                expected: bytes.len() as u64,
                actual: written,
            });
        }

        debug!(path = %target.display(), written, "document saved");
        Ok(SaveOutcome::Saved(target))
    }

    /// `{stem}_{timestamp}.{ext}`, with a counter if that is taken too.
    fn unique_path(&self, file_name: &str) -> PathBuf {
        let as_path = Path::new(file_name);
        let stem = as_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_owned());
        let ext = as_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f");

        let candidate = self.root.join(format!("{stem}_{stamp}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        (1u32..)
            .map(|n| self.root.join(format!("{stem}_{stamp}_{n}{ext}")))
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

/// Replace characters that would change directory or are invalid on common
/// filesystems.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        format!("_{cleaned}")
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_new_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("labels"));

        let outcome = store.save("INV001.pdf", b"%PDF-1.4 body").unwrap();
        let path = dir.path().join("labels").join("INV001.pdf");
        assert_eq!(outcome, SaveOutcome::Saved(path.clone()));
        assert_eq!(fs::read(path).unwrap(), b"%PDF-1.4 body");
    }

    #[test]
    fn identical_resave_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());

        store.save("INV001.pdf", b"%PDF-1.4 body").unwrap();
        let again = store.save("INV001.pdf", b"%PDF-1.4 body").unwrap();
        assert!(matches!(again, SaveOutcome::AlreadyPresent(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn different_length_gets_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());

        store.save("INV001.pdf", b"%PDF-1.4 original").unwrap();
        let outcome = store.save("INV001.pdf", b"%PDF-1.4 a longer revision").unwrap();

        let SaveOutcome::Saved(path) = outcome else {
            panic!("expected a new file");
        };
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("INV001_"));
        assert!(file_name.ends_with(".pdf"));
        assert_ne!(file_name, "INV001.pdf");

        // Original untouched.
        assert_eq!(
            fs::read(dir.path().join("INV001.pdf")).unwrap(),
            b"%PDF-1.4 original"
        );
        assert_eq!(fs::read(path).unwrap(), b"%PDF-1.4 a longer revision");
    }

    #[test]
    fn repeated_collisions_stay_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());

        store.save("a.pdf", b"1").unwrap();
        let second = store.save("a.pdf", b"22").unwrap();
        let third = store.save("a.pdf", b"333").unwrap();
        assert_ne!(second.path(), third.path());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn separators_cannot_escape_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("out"));

        let outcome = store.save("../../etc/passwd.pdf", b"x").unwrap();
        assert_eq!(outcome.path().parent().unwrap(), dir.path().join("out"));
    }

    #[test]
    fn empty_bytes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        assert!(store.save("a.pdf", b"").is_err());
    }

    #[test]
    fn empty_root_is_no_destination() {
        let store = DocumentStore::new("");
        assert!(matches!(
            store.save("a.pdf", b"x"),
            Err(LabelpressError::NoDestination)
        ));
    }
}
