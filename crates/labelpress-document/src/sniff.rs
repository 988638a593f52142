// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Byte-signature sniffing.

use labelpress_core::types::DocumentFormat;

/// Signatures in priority order. The first match wins.
const SIGNATURES: &[(&[u8], DocumentFormat)] = &[
    (b"%PDF", DocumentFormat::Pdf),
    (&[0x89, 0x50, 0x4E, 0x47], DocumentFormat::Png),
    (&[0xFF, 0xD8, 0xFF], DocumentFormat::Jpeg),
    (b"GIF", DocumentFormat::Gif),
    (b"BM", DocumentFormat::Bmp),
    (b"II", DocumentFormat::Tiff),
    (b"MM", DocumentFormat::Tiff),
];

/// Identify `bytes` by their leading signature.
///
/// Fewer than four bytes is always [`DocumentFormat::Unknown`].
pub fn detect_format(bytes: &[u8]) -> DocumentFormat {
    if bytes.len() < 4 {
        return DocumentFormat::Unknown;
    }
    SIGNATURES
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
        .map_or(DocumentFormat::Unknown, |(_, format)| *format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_signature() {
        assert_eq!(detect_format(b"%PDF-1.7"), DocumentFormat::Pdf);
        assert_eq!(
            detect_format(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]),
            DocumentFormat::Png
        );
        assert_eq!(detect_format(&[0xFF, 0xD8, 0xFF, 0xE0]), DocumentFormat::Jpeg);
        assert_eq!(detect_format(b"GIF89a"), DocumentFormat::Gif);
        assert_eq!(detect_format(b"BM\x36\x00"), DocumentFormat::Bmp);
        assert_eq!(detect_format(b"II*\x00"), DocumentFormat::Tiff);
        assert_eq!(detect_format(b"MM\x00*"), DocumentFormat::Tiff);
    }

    #[test]
    fn short_input_is_unknown() {
        assert_eq!(detect_format(b"%PD"), DocumentFormat::Unknown);
        assert_eq!(detect_format(b""), DocumentFormat::Unknown);
    }

    #[test]
    fn unrecognised_is_unknown() {
        assert_eq!(detect_format(b"hello world"), DocumentFormat::Unknown);
    }
}
