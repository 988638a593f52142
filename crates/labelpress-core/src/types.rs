// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Labelpress pipeline.

use serde::{Deserialize, Serialize};

/// Extension every stored and printed document carries.
pub const CANONICAL_EXTENSION: &str = "pdf";

/// Classification of errors for logging and per-cycle accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Network unreachable, timeout, non-2xx. Cycle ends early.
    Transport,
    /// Bad JSON or unexpected response shape. Cycle ends early.
    MalformedResponse,
    /// Bad base64, empty name, unsupported entry. Item skipped.
    Validation,
    /// I/O failure or verification mismatch while saving.
    Persistence,
    /// Every print strategy failed.
    Dispatch,
    /// Ledger or event log could not be initialised.
    Fatal,
}

/// Payload format as detected from its leading byte signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    Pdf,
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Unknown,
}

impl DocumentFormat {
    /// File extension used when staging bytes of this format on disk.
    /// Unknown payloads are staged as the canonical document type.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf | Self::Unknown => CANONICAL_EXTENSION,
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tif",
        }
    }

    /// MIME type string.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Unknown => "application/octet-stream",
        }
    }

    /// Whether this is a raster image that can be wrapped into a PDF page.
    pub fn is_raster(&self) -> bool {
        matches!(
            self,
            Self::Png | Self::Jpeg | Self::Gif | Self::Bmp | Self::Tiff
        )
    }

    /// Every extension the print dispatcher may stage files with.
    pub fn staging_extensions() -> &'static [&'static str] {
        &["pdf", "png", "jpg", "gif", "bmp", "tif"]
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// One entry of a remote response, after scalar coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    /// Base64 text, possibly with whitespace or a data-URI prefix.
    pub payload: String,
    /// Proposed filename exactly as delivered (stringified if numeric).
    pub name: String,
    /// Optional external identifier. Carried for logging only.
    pub id: Option<String>,
}

/// A validated payload ready for storage or dispatch.
#[derive(Debug, Clone)]
pub struct DecodedDocument {
    pub bytes: Vec<u8>,
    /// Trimmed, quote-stripped name ending in `.pdf`. This is the dedup key.
    pub canonical_name: String,
    pub detected_format: DocumentFormat,
}

impl DecodedDocument {
    /// Filename without the canonical extension.
    pub fn stem(&self) -> &str {
        let suffix_len = CANONICAL_EXTENSION.len() + 1;
        if self.canonical_name.len() > suffix_len {
            &self.canonical_name[..self.canonical_name.len() - suffix_len]
        } else {
            &self.canonical_name
        }
    }
}

/// Counters accumulated over one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Entries present in the `files` array.
    pub entries: usize,
    /// New items decoded this cycle.
    pub accepted: usize,
    /// Items skipped because the ledger already holds their name.
    pub skipped: usize,
    /// Entries rejected by shape or payload validation.
    pub errors: usize,
    pub saved: usize,
    pub save_failed: usize,
    pub printed: usize,
    pub print_failed: usize,
}

impl CycleSummary {
    /// True when the cycle accepted nothing new.
    pub fn is_idle(&self) -> bool {
        self.accepted == 0
    }
}

impl std::fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "New: {}, Skipped: {}, Errors: {}, Saved: {}, Printed: {}, Save failures: {}, Print failures: {}",
            self.accepted,
            self.skipped,
            self.errors,
            self.saved,
            self.printed,
            self.save_failed,
            self.print_failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_stages_as_pdf() {
        assert_eq!(DocumentFormat::Unknown.extension(), "pdf");
        assert_eq!(DocumentFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn raster_classification() {
        assert!(DocumentFormat::Tiff.is_raster());
        assert!(!DocumentFormat::Pdf.is_raster());
        assert!(!DocumentFormat::Unknown.is_raster());
    }

    #[test]
    fn stem_strips_canonical_extension() {
        let doc = DecodedDocument {
            bytes: Vec::new(),
            canonical_name: "INV001.pdf".into(),
            detected_format: DocumentFormat::Pdf,
        };
        assert_eq!(doc.stem(), "INV001");
    }

    #[test]
    fn summary_renders_counters() {
        let summary = CycleSummary {
            accepted: 2,
            skipped: 1,
            ..Default::default()
        };
        assert!(summary.to_string().starts_with("New: 2, Skipped: 1, Errors: 0"));
        assert!(!summary.is_idle());
    }
}
