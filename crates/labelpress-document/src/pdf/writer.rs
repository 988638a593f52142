// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — wrap a raster image into a one-page PDF using `printpdf` 0.8.
//
// Layout is computed against an A4 reference page in points (72 per inch).
// The image is drawn at 72 DPI so one pixel maps to one point before scaling.
// Images smaller than the reference keep their native size and the page
// shrinks to fit them; larger images are scaled down and centred on A4.

use labelpress_core::error::{LabelpressError, Result};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

/// Reference page width in points (A4).
pub const REFERENCE_WIDTH_PT: f32 = 595.0;
/// Reference page height in points (A4).
pub const REFERENCE_HEIGHT_PT: f32 = 842.0;

/// Image resolution used for placement; makes 1 px = 1 pt.
const PLACEMENT_DPI: f32 = 72.0;

const MM_PER_PT: f32 = 25.4 / 72.0;

/// Where an image of a given size lands on its page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub x: f32,
    pub y: f32,
    pub draw_width: f32,
    pub draw_height: f32,
    pub scale: f32,
}

/// Fit a `width` × `height` image against the reference page.
pub fn fit_to_reference(width: f32, height: f32) -> PageLayout {
    let scale = (REFERENCE_WIDTH_PT / width).min(REFERENCE_HEIGHT_PT / height);

    if scale > 1.0 {
        return PageLayout {
            page_width: width,
            page_height: height,
            x: 0.0,
            y: 0.0,
            draw_width: width,
            draw_height: height,
            scale: 1.0,
        };
    }

    let draw_width = width * scale;
    let draw_height = height * scale;
    PageLayout {
        page_width: REFERENCE_WIDTH_PT,
        page_height: REFERENCE_HEIGHT_PT,
        x: (REFERENCE_WIDTH_PT - draw_width) / 2.0,
        y: (REFERENCE_HEIGHT_PT - draw_height) / 2.0,
        draw_width,
        draw_height,
        scale,
    }
}

/// Builds single-page PDFs from encoded raster images.
#[derive(Debug, Default)]
pub struct PdfWriter {
    /// Title metadata embedded in the PDF /Info dictionary.
    title: Option<String>,
}

impl PdfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a title for the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Create a one-page PDF containing the image encoded in `image_bytes`.
    ///
    /// Any format the `image` crate can decode is accepted (PNG, JPEG, GIF,
    /// BMP, TIFF). Multi-frame images contribute their first frame.
    #[instrument(skip(self, image_bytes), fields(bytes_len = image_bytes.len()))]
    pub fn create_from_image(&self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        let title = self.title.as_deref().unwrap_or("Label");

        let dynamic_image = ::image::load_from_memory(image_bytes).map_err(|err| {
            LabelpressError::ImageError(format!("failed to decode image for PDF: {err}"))
        })?;

        let (img_width, img_height) = (dynamic_image.width(), dynamic_image.height());
        if img_width == 0 || img_height == 0 {
            return Err(LabelpressError::ImageError(format!(
                "image has no area ({img_width}x{img_height})"
            )));
        }

        let layout = fit_to_reference(img_width as f32, img_height as f32);
        info!(
            title,
            img_width,
            img_height,
            scale = layout.scale,
            "Creating image PDF"
        );

        let raw = RawImage {
            pixels: RawImageData::U8(dynamic_image.to_rgb8().into_raw()),
            width: img_width as usize,
            height: img_height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new(title);
        let xobject_id = doc.add_image(&raw);

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(layout.x)),
                translate_y: Some(Pt(layout.y)),
                scale_x: Some(layout.scale),
                scale_y: Some(layout.scale),
                dpi: Some(PLACEMENT_DPI),
                rotate: None,
            },
        }];

        let page = PdfPage::new(
            Mm(layout.page_width * MM_PER_PT),
            Mm(layout.page_height * MM_PER_PT),
            ops,
        );
        doc.with_pages(vec![page]);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings while saving");
        }

        debug!(
            draw_width = layout.draw_width,
            draw_height = layout.draw_height,
            output_bytes = output.len(),
            "Image placed on page"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::reader::PdfReader;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ::image::RgbImage::from_pixel(width, height, ::image::Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ::image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn small_image_keeps_native_size() {
        let layout = fit_to_reference(200.0, 100.0);
        assert_eq!(layout.scale, 1.0);
        assert_eq!((layout.page_width, layout.page_height), (200.0, 100.0));
        assert_eq!((layout.x, layout.y), (0.0, 0.0));
    }

    #[test]
    fn large_image_is_scaled_and_centred() {
        let layout = fit_to_reference(1190.0, 842.0);
        assert!((layout.scale - 0.5).abs() < 1e-6);
        assert!(layout.draw_width <= REFERENCE_WIDTH_PT + 1e-3);
        assert!(layout.draw_height <= REFERENCE_HEIGHT_PT + 1e-3);
        assert!(layout.x.abs() < 1e-3);
        let expected_y = (REFERENCE_HEIGHT_PT - 421.0) / 2.0;
        assert!((layout.y - expected_y).abs() < 1e-3);
    }

    #[test]
    fn tall_image_is_centred_horizontally() {
        let layout = fit_to_reference(300.0, 1684.0);
        assert!((layout.scale - 0.5).abs() < 1e-6);
        let left = layout.x;
        let right = REFERENCE_WIDTH_PT - layout.x - layout.draw_width;
        assert!((left - right).abs() < 1e-3);
        assert!(layout.y.abs() < 1e-3);
    }

    #[test]
    fn exact_reference_is_not_upscaled() {
        let layout = fit_to_reference(REFERENCE_WIDTH_PT, REFERENCE_HEIGHT_PT);
        assert_eq!(layout.scale, 1.0);
        assert_eq!(layout.page_width, REFERENCE_WIDTH_PT);
    }

    #[test]
    fn create_from_png_produces_one_page() {
        let bytes = PdfWriter::new()
            .with_title("label7")
            .create_from_image(&png(40, 20))
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let reader = PdfReader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.page_count(), 1);
        let (w, h) = reader.page_size(1).unwrap();
        assert!((w - 40.0).abs() < 1.0, "width was {w}");
        assert!((h - 20.0).abs() < 1.0, "height was {h}");
    }

    #[test]
    fn oversized_image_lands_on_reference_page() {
        let bytes = PdfWriter::new()
            .create_from_image(&png(1190, 842))
            .unwrap();

        let reader = PdfReader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.page_count(), 1);
        let (w, h) = reader.page_size(1).unwrap();
        assert!((w - REFERENCE_WIDTH_PT).abs() < 1.0, "width was {w}");
        assert!((h - REFERENCE_HEIGHT_PT).abs() < 1.0, "height was {h}");
    }

    #[test]
    fn garbage_is_an_image_error() {
        let err = PdfWriter::new().create_from_image(b"not an image").unwrap_err();
        assert!(matches!(err, LabelpressError::ImageError(_)));
    }
}
