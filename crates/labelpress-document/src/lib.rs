// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// labelpress-document — Everything between a base64 string and a file on disk.
//
// Provides payload cleaning and decoding, byte-signature sniffing, raster to
// PDF normalisation against an A4 reference page, light PDF inspection, and
// collision-safe persistence into the destination folder.

pub mod codec;
pub mod convert;
pub mod pdf;
pub mod sniff;
pub mod store;

pub use codec::{canonical_name, decode_document, decode_payload};
pub use convert::{Normalized, normalize};
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;
pub use sniff::detect_format;
pub use store::{DocumentStore, SaveOutcome};
