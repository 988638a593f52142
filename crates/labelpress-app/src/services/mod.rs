// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — wires the backend crates into a running label station.
//
// `AppServices` owns the durable state (ledger, event log, settings) and the
// print dispatcher; `Pipeline` runs one cycle; `PollerHandle` drives cycles
// from a timer.

pub mod app_services;
pub mod data_dir;
pub mod pipeline;
pub mod poller;
pub mod remote;
