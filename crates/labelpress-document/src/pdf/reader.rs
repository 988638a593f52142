// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — inspect finished documents using the `lopdf` crate.

use lopdf::{Dictionary, Document, Object, ObjectId};
use labelpress_core::error::{LabelpressError, Result};
use tracing::{debug, instrument};

/// Read-only view of a PDF held in memory.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    /// Parse raw PDF bytes.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            LabelpressError::PdfError(format!("failed to load PDF from memory: {err}"))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Width and height in points of page `page_number` (1-indexed).
    ///
    /// The MediaBox is inherited through the page tree when the page itself
    /// does not carry one.
    pub fn page_size(&self, page_number: u32) -> Result<(f32, f32)> {
        let pages = self.document.get_pages();
        let page_id = *pages.get(&page_number).ok_or_else(|| {
            LabelpressError::PdfError(format!(
                "page {page_number} not found (document has {} pages)",
                pages.len()
            ))
        })?;

        let media_box = self.inherited_media_box(page_id).ok_or_else(|| {
            LabelpressError::PdfError(format!("page {page_number} has no MediaBox"))
        })?;

        let coords: Vec<f32> = media_box.iter().filter_map(number).collect();
        match coords.as_slice() {
            [x0, y0, x1, y1] => Ok(((x1 - x0).abs(), (y1 - y0).abs())),
            _ => Err(LabelpressError::PdfError(format!(
                "page {page_number} has a malformed MediaBox"
            ))),
        }
    }

    fn inherited_media_box(&self, start: ObjectId) -> Option<Vec<Object>> {
        let mut current = Some(start);
        // Bounded walk; a malformed tree could loop through /Parent.
        for _ in 0..32 {
            let dict = self.dictionary(current?)?;
            if let Ok(value) = dict.get(b"MediaBox") {
                let resolved = match value {
                    Object::Reference(id) => self.document.get_object(*id).ok()?,
                    other => other,
                };
                return resolved.as_array().ok().cloned();
            }
            current = dict.get(b"Parent").ok().and_then(|p| p.as_reference().ok());
        }
        None
    }

    fn dictionary(&self, id: ObjectId) -> Option<&Dictionary> {
        self.document.get_object(id).ok()?.as_dict().ok()
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
