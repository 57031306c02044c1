// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sample inputs for tests.
//
// Sample PDFs put Resources and MediaBox on the Pages node rather than on each
// page, so anything that copies pages has to handle inheritance.

use std::path::Path;

use image::{Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pagewerk_core::error::{PagewerkError, Result};

/// Write a `pages`-page A4 PDF whose pages read "Page 1", "Page 2", ...
pub fn write_sample_pdf(path: &Path, pages: u32) -> Result<()> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for n in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {n}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|err| PagewerkError::PdfError(format!("fixture content: {err}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(path)
        .map_err(|err| PagewerkError::PdfError(format!("fixture save: {err}")))?;
    Ok(())
}

/// Write a file with a `.pdf`-looking name that no PDF reader accepts.
pub fn write_garbage(path: &Path) -> Result<()> {
    std::fs::write(path, b"GIF89a definitely not a document\n")?;
    Ok(())
}

/// Write a solid-colour PNG of the given size.
pub fn write_sample_png(path: &Path, width: u32, height: u32) -> Result<()> {
    RgbImage::from_pixel(width, height, Rgb([200, 40, 40]))
        .save(path)
        .map_err(|err| PagewerkError::ImageError(format!("fixture png: {err}")))
}
