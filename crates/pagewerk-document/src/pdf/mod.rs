// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading, page copying, inspection, and creating PDFs from images.

pub mod copy;
pub mod inspect;
pub mod reader;
pub mod writer;

pub use copy::{PageCopier, PageSink};
pub use inspect::{DocumentMetadata, extract_metadata, is_valid_pdf, page_count};
pub use reader::PdfReader;
pub use writer::PdfWriter;
