// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Normalisation to the canonical document format.
//
// PDF payloads pass through untouched. Raster images are wrapped into a
// one-page PDF. Anything else passes through with a warning so that the
// operator still gets a file to inspect.

use std::borrow::Cow;

use labelpress_core::error::Result;
use labelpress_core::types::{DecodedDocument, DocumentFormat};
use tracing::{debug, info, instrument, warn};

use crate::pdf::reader::PdfReader;
use crate::pdf::writer::PdfWriter;

/// Bytes ready to be stored or printed, with the format they are in.
#[derive(Debug)]
pub struct Normalized<'a> {
    pub bytes: Cow<'a, [u8]>,
    pub format: DocumentFormat,
    /// True when the bytes were produced by raster conversion.
    pub converted: bool,
}

/// Bring `doc` into the canonical format where possible.
///
/// Fails only when a raster image cannot be decoded; callers fall back to the
/// raw bytes in that case.
#[instrument(skip(doc), fields(name = %doc.canonical_name, format = %doc.detected_format))]
pub fn normalize(doc: &DecodedDocument) -> Result<Normalized<'_>> {
    match doc.detected_format {
        DocumentFormat::Pdf => {
            match PdfReader::from_bytes(&doc.bytes) {
                Ok(reader) => debug!(pages = reader.page_count(), "PDF passes through"),
                Err(e) => warn!(error = %e, "PDF signature present but document does not parse"),
            }
            Ok(passthrough(doc))
        }
        format if format.is_raster() => {
            let pdf = PdfWriter::new()
                .with_title(doc.stem())
                .create_from_image(&doc.bytes)?;
            info!(
                input_bytes = doc.bytes.len(),
                output_bytes = pdf.len(),
                "Converted image to PDF"
            );
            Ok(Normalized {
                bytes: Cow::Owned(pdf),
                format: DocumentFormat::Pdf,
                converted: true,
            })
        }
        _ => {
            warn!("Unrecognised payload format, passing bytes through unchanged");
            Ok(passthrough(doc))
        }
    }
}

/// The decoded bytes as they are.
pub fn passthrough(doc: &DecodedDocument) -> Normalized<'_> {
    Normalized {
        bytes: Cow::Borrowed(&doc.bytes),
        format: doc.detected_format,
        converted: false,
    }
}
