// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk-document — Document processing for the Pagewerk job pipeline.
//
// Provides page-range parsing, PDF assembly (merge) and partitioning (split),
// tiered compression with an in-process fallback, format conversion through
// Ghostscript and LibreOffice, image embedding, and zip bundling of
// multi-file results. Every operation writes into a caller-supplied path or
// directory; none of them deletes anything.

pub mod assemble;
pub mod bundle;
pub mod compress;
pub mod convert;
pub mod outcome;
pub mod partition;
pub mod pdf;
pub mod range;
pub mod tool;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

// Re-export the primary entry points so callers can use
// `pagewerk_document::merge` etc.
pub use assemble::{MergeReport, merge};
pub use bundle::bundle;
pub use compress::{CompressionEngine, CompressionStats};
pub use convert::{OfficeConversion, OfficeConverter, Rasterizer};
pub use outcome::{Attempts, SkippedUnit, UnitOutcome};
pub use partition::{split, validate_strategy};
pub use pdf::{DocumentMetadata, PdfReader, PdfWriter};
pub use range::{PageIndexSet, parse as parse_page_range};
