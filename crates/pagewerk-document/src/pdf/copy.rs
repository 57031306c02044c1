// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page copying between lopdf documents.
//
// `PageSink` is a fresh output document with a real catalog and page tree.
// `PageCopier` deep-copies pages from one source into one sink, following
// references. Each source object is copied at most once per copier, so shared
// resources stay shared and reference cycles (annotation /P back to its page,
// for instance) terminate.

use std::collections::HashMap;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use pagewerk_core::error::{PagewerkError, Result};
use tracing::{debug, instrument, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed, cyclic /Parent chains.
const MAX_TREE_DEPTH: usize = 64;

/// An output document under construction.
pub struct PageSink {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for PageSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSink {
    pub fn new() -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        Self {
            document,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kids.is_empty()
    }

    fn append_page(&mut self, page_id: ObjectId, mut page: Dictionary) {
        page.set("Parent", self.pages_id);
        self.document.objects.insert(page_id, Object::Dictionary(page));
        self.kids.push(Object::Reference(page_id));
    }

    /// Finish the page tree and write the document to `path`.
    ///
    /// Returns the number of pages written.
    #[instrument(skip_all, fields(path = %path.display(), pages = self.kids.len()))]
    pub fn save(mut self, path: &Path) -> Result<usize> {
        let count = self.kids.len();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids,
            "Count" => count as i64,
        };
        self.document
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        self.document.compress();
        self.document.save(path).map_err(|err| {
            PagewerkError::PdfError(format!("failed to write {}: {}", path.display(), err))
        })?;

        debug!(pages = count, "Document saved");
        Ok(count)
    }
}

/// Copies pages from one source document into one [`PageSink`].
///
/// A copier must not be reused with a different sink: its memo maps source
/// IDs to IDs inside the sink it has been feeding.
pub struct PageCopier<'a> {
    source: &'a Document,
    remap: HashMap<ObjectId, ObjectId>,
}

impl<'a> PageCopier<'a> {
    pub fn new(source: &'a Document) -> Self {
        Self {
            source,
            remap: HashMap::new(),
        }
    }

    /// Append the page `page_id` of the source to `sink`.
    ///
    /// Inherited attributes are written onto the copied page, since the
    /// source's intermediate page-tree nodes are not carried over.
    pub fn copy_page(&mut self, page_id: ObjectId, sink: &mut PageSink) -> Result<()> {
        let source = self.source;
        let page = source.get_dictionary(page_id).map_err(|err| {
            PagewerkError::PdfError(format!("cannot read page object {:?}: {}", page_id, err))
        })?;

        let mut flattened = page.clone();
        for key in INHERITABLE {
            if !flattened.has(key)
                && let Some(value) = inherited_attribute(source, page, key)
            {
                flattened.set(key, value);
            }
        }

        let target = &mut sink.document;
        let new_id = match self.remap.get(&page_id) {
            Some(id) => *id,
            None => {
                let id = target.new_object_id();
                self.remap.insert(page_id, id);
                id
            }
        };
        let copied = self.copy_dictionary(&flattened, target);
        sink.append_page(new_id, copied);
        Ok(())
    }

    fn copy_object(&mut self, object: &Object, target: &mut Document) -> Object {
        match object {
            Object::Reference(id) => self.copy_reference(*id, target),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict, target)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(item, target))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dictionary(&stream.dict, target);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, dict: &Dictionary, target: &mut Document) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            // The sink owns the page tree; parents are re-linked there.
            if key.as_slice() == b"Parent" {
                continue;
            }
            let value = self.copy_object(value, target);
            copy.set(key.clone(), value);
        }
        copy
    }

    fn copy_reference(&mut self, id: ObjectId, target: &mut Document) -> Object {
        if let Some(mapped) = self.remap.get(&id) {
            return Object::Reference(*mapped);
        }
        let source = self.source;
        let referenced = match source.get_object(id) {
            Ok(object) => object,
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                return Object::Null;
            }
        };

        let new_id = target.new_object_id();
        self.remap.insert(id, new_id);
        let copied = self.copy_object(referenced, target);
        target.objects.insert(new_id, copied);
        Object::Reference(new_id)
    }
}

fn inherited_attribute(source: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut current = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = source.get_dictionary(current?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}
