// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — build a new PDF from raster images using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use std::path::{Path, PathBuf};

use pagewerk_core::PaperSize;
use pagewerk_core::error::{PagewerkError, Result};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use crate::outcome::{Attempts, UnitOutcome, file_label};

/// Extensions accepted by [`PdfWriter::images_to_pdf`].
const ACCEPTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Images are placed at 72 DPI so one pixel starts out as one point.
const PLACEMENT_DPI: f32 = 72.0;

/// Where an image lands on the page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scale an `image_w` x `image_h` box uniformly to fit the canvas, up or
/// down, and centre it.
pub fn fit_centered(image_w: f32, image_h: f32, canvas_w: f32, canvas_h: f32) -> Placement {
    let scale = (canvas_w / image_w).min(canvas_h / image_h);
    let width = image_w * scale;
    let height = image_h * scale;
    Placement {
        scale,
        x: (canvas_w - width) / 2.0,
        y: (canvas_h - height) / 2.0,
        width,
        height,
    }
}

/// Title written into the /Info dictionary of image PDFs.
const DOCUMENT_TITLE: &str = "Pagewerk Images";

/// Creates new PDF documents, one image per page.
pub struct PdfWriter {
    /// Canvas for every page.
    paper_size: PaperSize,
}

impl PdfWriter {
    /// Create a new writer targeting the given paper size.
    pub fn new(paper_size: PaperSize) -> Self {
        Self { paper_size }
    }

    /// Embed `images` in order, one per page, and write the PDF to `output`.
    ///
    /// Unsupported extensions and undecodable images are skipped. Fails when
    /// no image could be embedded.
    #[instrument(skip_all, fields(count = images.len(), output = %output.display()))]
    pub fn images_to_pdf(&self, images: &[PathBuf], output: &Path) -> Result<Attempts<PathBuf>> {
        let (canvas_w, canvas_h) = self.paper_size.dimensions_pt();
        let page_w = Mm(canvas_w * 25.4 / 72.0);
        let page_h = Mm(canvas_h * 25.4 / 72.0);
        info!(paper = ?self.paper_size, "Creating image PDF");

        let mut doc = PdfDocument::new(DOCUMENT_TITLE);
        let mut pages: Vec<PdfPage> = Vec::new();
        let mut attempts = Attempts::new();

        for path in images {
            let unit = file_label(path);

            let raw = match load_raw_image(path) {
                Ok(raw) => raw,
                Err(err) => {
                    attempts.record(UnitOutcome::from_result(unit, Err(err)));
                    continue;
                }
            };

            let placement = fit_centered(
                raw.width as f32,
                raw.height as f32,
                canvas_w,
                canvas_h,
            );
            let xobject_id = doc.add_image(&raw);
            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(placement.x)),
                    translate_y: Some(Pt(placement.y)),
                    scale_x: Some(placement.scale),
                    scale_y: Some(placement.scale),
                    dpi: Some(PLACEMENT_DPI),
                    rotate: None,
                },
            }];
            pages.push(PdfPage::new(page_w, page_h, ops));

            debug!(unit = %unit, scale = placement.scale, "Image placed on page");
            attempts.record(UnitOutcome::Done(path.clone()));
        }

        let attempts = attempts.require_any("No valid images could be converted")?;

        doc.with_pages(pages);
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        std::fs::write(output, &bytes)?;

        info!(
            pages = attempts.successes.len(),
            skipped = attempts.skips.len(),
            "Wrote image PDF to {}",
            output.display()
        );
        Ok(attempts)
    }
}

fn load_raw_image(path: &Path) -> Result<RawImage> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(PagewerkError::ImageError(format!(
            "unsupported image type '.{ext}'"
        )));
    }

    let bytes = std::fs::read(path)?;
    let dynamic_image = ::image::load_from_memory(&bytes).map_err(|err| {
        PagewerkError::ImageError(format!("failed to decode image for PDF: {}", err))
    })?;

    let width = dynamic_image.width() as usize;
    let height = dynamic_image.height() as usize;
    let rgb_image = dynamic_image.to_rgb8();
    Ok(RawImage {
        pixels: RawImageData::U8(rgb_image.into_raw()),
        width,
        height,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::pdf::PdfReader;

    #[test]
    fn small_images_scale_up_and_centre() {
        let p = fit_centered(100.0, 50.0, 595.0, 842.0);
        assert!((p.scale - 5.95).abs() < 1e-4);
        assert!((p.width - 595.0).abs() < 1e-3);
        assert!(p.x.abs() < 1e-3);
        assert!((p.y - (842.0 - 297.5) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn large_images_scale_down() {
        let p = fit_centered(2000.0, 4000.0, 595.0, 842.0);
        assert!(p.scale < 1.0);
        assert!((p.height - 842.0).abs() < 1e-3);
        assert!((p.x - (595.0 - 421.0) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn skips_unsupported_and_broken_images() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.png");
        let broken = dir.path().join("b.jpg");
        let gif = dir.path().join("c.gif");
        let second = dir.path().join("d.PNG");
        fixtures::write_sample_png(&good, 40, 30).unwrap();
        std::fs::write(&broken, b"not a jpeg").unwrap();
        fixtures::write_sample_png(&gif, 10, 10).unwrap();
        fixtures::write_sample_png(&second, 10, 80).unwrap();

        let output = dir.path().join("images.pdf");
        let attempts = PdfWriter::new(PaperSize::A4)
            .images_to_pdf(&[good.clone(), broken, gif, second.clone()], &output)
            .unwrap();

        assert_eq!(attempts.successes, vec![good, second]);
        assert_eq!(attempts.skips.len(), 2);
        assert_eq!(PdfReader::open(&output).unwrap().page_count(), 2);
    }

    #[test]
    fn no_usable_images_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("images.pdf");
        let err = PdfWriter::new(PaperSize::A4)
            .images_to_pdf(&[dir.path().join("x.tiff")], &output)
            .unwrap_err();
        assert!(matches!(err, PagewerkError::NoOutputsProduced(_)));
        assert!(!output.exists());
    }
}
