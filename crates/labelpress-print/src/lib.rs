// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// labelpress-print — Hand finished documents to a physical printer.
//
// Bytes are staged in a uniquely named temp file, then offered to a list of
// OS print strategies until one accepts them. Staged files are deleted after
// a delay, swept periodically, and flushed on shutdown.

pub mod cleanup;
pub mod dispatcher;
pub mod strategy;

pub use cleanup::{CleanupConfig, TempFileCleaner};
pub use dispatcher::{DispatchConfig, DispatchReceipt, PrintDispatcher};
pub use strategy::{PrintStrategy, Quoting, StrategyKind};
