// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Payload codec — name canonicalisation and lenient base64 decoding.
//
// Remote payloads arrive wrapped at arbitrary widths, sometimes as data URIs,
// and sometimes with their padding stripped. Cleaning removes the wrapping;
// padding is restored when one or two characters are missing. A payload that
// would need three pad characters cannot be valid base64 and is rejected.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use labelpress_core::error::{LabelpressError, Result};
use labelpress_core::types::{CANONICAL_EXTENSION, DecodedDocument, DocumentFormat};
use tracing::{debug, instrument, warn};

use crate::sniff::detect_format;

/// Number of cleaned payload characters included in decode diagnostics.
pub const PREVIEW_CHARS: usize = 100;

/// Standard alphabet, tolerant of non-zero trailing bits.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Turn a delivered filename into the ledger key and on-disk name.
///
/// Surrounding whitespace and double quotes are removed, then `.pdf` is
/// appended unless the name already ends with it (case-insensitive).
pub fn canonical_name(raw: &str) -> Result<String> {
    let name = raw.trim().trim_matches('"').trim();
    if name.is_empty() {
        return Err(LabelpressError::EmptyName);
    }

    let suffix = format!(".{CANONICAL_EXTENSION}");
    let has_suffix = name.len() >= suffix.len()
        && name
            .get(name.len() - suffix.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(&suffix));

    if has_suffix {
        Ok(name.to_owned())
    } else {
        Ok(format!("{name}{suffix}"))
    }
}

/// Remove all whitespace and any `scheme:...,` data-URI prefix.
pub fn clean(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.split_once(',') {
        Some((prefix, rest)) if prefix.contains(':') => rest.to_owned(),
        _ => compact,
    }
}

/// The first [`PREVIEW_CHARS`] characters of the cleaned payload.
pub fn payload_preview(raw: &str) -> String {
    clean(raw).chars().take(PREVIEW_CHARS).collect()
}

/// Right-pad `cleaned` with `=` up to the next multiple of four.
fn pad(cleaned: &str) -> String {
    let missing = (4 - cleaned.len() % 4) % 4;
    let mut padded = String::with_capacity(cleaned.len() + missing);
    padded.push_str(cleaned);
    padded.extend(std::iter::repeat_n('=', missing));
    padded
}

/// Base64 alphabet followed by at most two `=`.
fn is_well_formed(padded: &str) -> bool {
    let body = padded.trim_end_matches('=');
    let pad_len = padded.len() - body.len();
    pad_len <= 2
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// Clean, pad, validate, and decode a base64 payload.
///
/// `name` is only used to label the error.
#[instrument(skip(raw), fields(raw_len = raw.len()))]
pub fn decode_payload(name: &str, raw: &str) -> Result<Vec<u8>> {
    let invalid = |reason: String| LabelpressError::InvalidPayload {
        name: name.to_owned(),
        reason,
    };

    let cleaned = clean(raw);
    if cleaned.is_empty() {
        return Err(invalid("payload is empty".into()));
    }

    let padded = pad(&cleaned);
    let added = padded.len() - cleaned.len();
    if added > 0 {
        debug!(added, "restored base64 padding");
    }

    if !is_well_formed(&padded) {
        return Err(invalid(if added == 3 {
            "length is not a valid base64 length".into()
        } else {
            "contains characters outside the base64 alphabet".into()
        }));
    }

    LENIENT
        .decode(padded.as_bytes())
        .map_err(|e| invalid(e.to_string()))
}

/// Decode `payload` for an already canonicalised name and sniff its format.
///
/// Bytes whose signature is not `%PDF` are kept; the mismatch is only logged.
#[instrument(skip(payload), fields(name = %canonical_name))]
pub fn decode_document(canonical_name: String, payload: &str) -> Result<DecodedDocument> {
    let bytes = decode_payload(&canonical_name, payload)?;
    let detected_format = detect_format(&bytes);

    if detected_format != DocumentFormat::Pdf {
        warn!(
            format = %detected_format,
            bytes = bytes.len(),
            "payload signature does not match a PDF document"
        );
    }
    debug!(bytes = bytes.len(), format = %detected_format, "payload decoded");

    Ok(DecodedDocument {
        bytes,
        canonical_name,
        detected_format,
    })
}
