// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — creating single-page documents from images and inspecting
// finished documents.

pub mod reader;
pub mod writer;

pub use reader::PdfReader;
pub use writer::{PageLayout, PdfWriter, fit_to_reference};
