// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// labelpress-journal — Durable records kept by the pipeline.
//
// The ledger remembers every document name already accepted so that a label
// is never saved or printed twice across restarts. The event log is the
// operator-facing journal of every decision the pipeline takes, with
// retention pruning and a live subscription channel.

pub mod event_log;
pub mod integrity;
pub mod ledger;

pub use event_log::EventLog;
pub use integrity::hash_bytes;
pub use ledger::Ledger;
