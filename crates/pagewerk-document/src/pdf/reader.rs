// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open existing documents with `lopdf` and expose their page
// tree in page order.

use std::path::Path;

use lopdf::{Document, ObjectId};
use pagewerk_core::error::{PagewerkError, Result};
use tracing::{debug, info, instrument};

/// A loaded source document.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Page object IDs, first page first.
    page_ids: Vec<ObjectId>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            PagewerkError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        Ok(Self::from_document(document))
    }

    fn from_document(document: Document) -> Self {
        // get_pages is keyed by 1-indexed page number, so values come out in order.
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        debug!(pages = page_ids.len(), "PDF loaded");
        Self { document, page_ids }
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    /// Object ID of the page at 0-indexed `index`.
    pub fn page_id(&self, index: usize) -> Option<ObjectId> {
        self.page_ids.get(index).copied()
    }

    /// All page object IDs in page order.
    pub fn page_ids(&self) -> &[ObjectId] {
        &self.page_ids
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for tests that damage a loaded document.
    #[cfg(test)]
    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }
}
