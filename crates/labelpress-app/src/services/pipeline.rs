// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ingestion pipeline — one cycle of fetch, validate, dedup, persist, print.
//
// Per entry:
//   canonical name -> ledger check -> decode -> normalise -> save (if enabled)
//   -> ledger record -> print (if enabled)
//
// The ledger is written after a successful save and always before a print,
// so a crash can never cause a second print on restart. An item whose save
// failed and that is not printed stays out of the ledger and is retried on
// the next cycle. No failure inside an entry stops the rest of the batch.

use std::sync::Arc;

use labelpress_core::Settings;
use labelpress_core::error::LabelpressError;
use labelpress_core::types::{CycleSummary, DocumentFormat, ErrorClass, RawItem};
use labelpress_document::codec::{canonical_name, decode_document, payload_preview};
use labelpress_document::convert::{normalize, passthrough};
use labelpress_document::{DocumentStore, SaveOutcome};
use labelpress_journal::integrity::short_hash;
use labelpress_journal::{EventLog, Ledger};
use labelpress_print::PrintDispatcher;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::remote::RemoteSource;

/// How a call to [`Pipeline::run_cycle`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Endpoint or caller id missing; no request was made.
    NotConfigured,
    /// Another cycle was still running.
    Skipped,
    /// The remote call failed; nothing was processed.
    FetchFailed(ErrorClass),
    /// The remote answered with a message instead of files.
    Message(String),
    /// Entries were processed (possibly zero).
    Completed(CycleSummary),
}

pub struct Pipeline {
    remote: RemoteSource,
    ledger: Arc<Ledger>,
    events: Arc<EventLog>,
    dispatcher: Arc<PrintDispatcher>,
    in_flight: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        remote: RemoteSource,
        ledger: Arc<Ledger>,
        events: Arc<EventLog>,
        dispatcher: Arc<PrintDispatcher>,
    ) -> Self {
        Self {
            remote,
            ledger,
            events,
            dispatcher,
            in_flight: Mutex::new(()),
        }
    }

    /// Run one cycle against the given settings snapshot.
    #[instrument(skip_all)]
    pub async fn run_cycle(&self, settings: &Settings) -> CycleOutcome {
        let Ok(_running) = self.in_flight.try_lock() else {
            self.events
                .write("Previous poll still in progress, skipping this tick.");
            return CycleOutcome::Skipped;
        };

        if !settings.is_remote_configured() {
            self.events
                .write("API URL or user ID not configured. Skipping poll.");
            return CycleOutcome::NotConfigured;
        }

        let batch = match self
            .remote
            .fetch(&settings.endpoint_url, &settings.caller_id)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                let class = e.class();
                let label = match class {
                    ErrorClass::MalformedResponse => "Invalid API response",
                    _ => "Network error",
                };
                self.events.write(format!("ERROR: {label}: {e}"));
                return CycleOutcome::FetchFailed(class);
            }
        };

        if !batch.has_files {
            return match batch.message {
                Some(message) => {
                    self.events.write(format!("API message: {message}"));
                    CycleOutcome::Message(message)
                }
                None => {
                    self.events.write("Response contained no files field.");
                    CycleOutcome::Completed(CycleSummary::default())
                }
            };
        }

        if batch.entries.is_empty() {
            self.events.write("No new files to process.");
            return CycleOutcome::Completed(CycleSummary::default());
        }

        let mut summary = CycleSummary {
            entries: batch.entries.len(),
            ..Default::default()
        };
        self.events
            .write(format!("Received {} file entries.", summary.entries));

        for (index, entry) in batch.entries.into_iter().enumerate() {
            match entry {
                Ok(item) => self.process_item(settings, index + 1, &item, &mut summary).await,
                Err(e) => {
                    self.events.write(format!("ERROR: {e}"));
                    summary.errors += 1;
                }
            }
        }

        self.events
            .write(format!("Processing complete - {summary}"));
        if summary.is_idle() {
            let reason = if summary.errors > 0 {
                "due to errors"
            } else {
                "all previously processed"
            };
            self.events
                .write(format!("No new files processed - {reason}."));
        }
        CycleOutcome::Completed(summary)
    }

    async fn process_item(
        &self,
        settings: &Settings,
        position: usize,
        item: &RawItem,
        summary: &mut CycleSummary,
    ) {
        let name = match canonical_name(&item.name) {
            Ok(name) => name,
            Err(e) => {
                self.events
                    .write(format!("ERROR: {e} for entry {position}"));
                summary.errors += 1;
                return;
            }
        };
        debug!(position, name = %name, id = ?item.id, "entry accepted for inspection");

        if self.ledger.contains(&name) {
            self.events
                .write(format!("Skipping: {name} (already processed)"));
            summary.skipped += 1;
            return;
        }

        let doc = match decode_document(name, &item.payload) {
            Ok(doc) => doc,
            Err(e) => {
                self.events.write(format!("ERROR: {e}"));
                self.events.write(format!(
                    "Base64 sample (first 100 chars): {}",
                    payload_preview(&item.payload)
                ));
                summary.errors += 1;
                return;
            }
        };
        let name = doc.canonical_name.as_str();

        if doc.detected_format != DocumentFormat::Pdf {
            self.events.write(format!(
                "WARNING: {name} doesn't appear to be a PDF (detected {})",
                doc.detected_format
            ));
        }

        summary.accepted += 1;
        self.events.write(format!(
            "Decoded {name}: {} bytes ({}), sha256 {}",
            doc.bytes.len(),
            doc.detected_format.mime_type(),
            short_hash(&doc.bytes)
        ));

        let ready = if settings.convert_images {
            match normalize(&doc) {
                Ok(ready) => ready,
                Err(e) => {
                    self.events.write(format!(
                        "WARNING: could not convert {name} to PDF, using original bytes: {e}"
                    ));
                    passthrough(&doc)
                }
            }
        } else {
            passthrough(&doc)
        };
        if ready.converted {
            self.events.write(format!(
                "Converted {} image to PDF: {name}",
                doc.detected_format
            ));
        }

        let saved = !settings.save_enabled || self.save(settings, name, &ready.bytes, summary);

        // An unsaved item stays eligible for the next cycle unless it is about
        // to be printed; the ledger must hold it before any print starts.
        let print_target = settings.print_target();
        if !saved && print_target.is_none() {
            self.events
                .write(format!("{name} not saved, will retry on the next poll."));
            return;
        }
        if let Err(e) = self.ledger.record(name) {
            self.events
                .write(format!("WARNING: could not persist ledger entry for {name}: {e}"));
        }

        if let Some(device) = print_target {
            match self
                .dispatcher
                .dispatch(&ready.bytes, ready.format, device)
                .await
            {
                Ok(receipt) => {
                    summary.printed += 1;
                    self.events.write(format!(
                        "Print job sent: {name} -> {device} (via {})",
                        receipt.strategy
                    ));
                }
                Err(e) => {
                    summary.print_failed += 1;
                    self.events
                        .write(format!("ERROR: could not print {name}: {e}"));
                }
            }
        }
    }

    /// Persist `bytes` into the configured folder. Returns whether the
    /// document is now on disk.
    fn save(
        &self,
        settings: &Settings,
        name: &str,
        bytes: &[u8],
        summary: &mut CycleSummary,
    ) -> bool {
        let Some(root) = settings.save_target() else {
            summary.save_failed += 1;
            self.events.write(format!(
                "ERROR: could not save {name}: {}",
                LabelpressError::NoDestination
            ));
            return false;
        };

        let store = DocumentStore::new(root);
        match store.save(name, bytes) {
            Ok(SaveOutcome::Saved(path)) => {
                summary.saved += 1;
                self.events.write(format!(
                    "File saved: {} ({} bytes)",
                    path.display(),
                    bytes.len()
                ));
                true
            }
            Ok(SaveOutcome::AlreadyPresent(path)) => {
                summary.saved += 1;
                self.events.write(format!(
                    "File already exists with same size, skipping: {}",
                    path.display()
                ));
                true
            }
            Err(e) => {
                summary.save_failed += 1;
                self.events.write(format!(
                    "ERROR: could not save {name} to {}: {e}",
                    store.root().display()
                ));
                false
            }
        }
    }
}
