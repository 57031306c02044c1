// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagewerk.
//
// Unit-level failures (one page, one file, one image) are never errors here:
// they are recorded as `Skipped` outcomes and the operation carries on. Every
// variant below is fatal for the job that raised it.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for all Pagewerk operations.
#[derive(Debug, Error)]
pub enum PagewerkError {
    // -- Request errors --
    #[error("invalid request: {0}")]
    Validation(String),

    // -- Empty results --
    #[error("no valid content: {0}")]
    NoValidContent(String),

    #[error("no outputs produced: {0}")]
    NoOutputsProduced(String),

    // -- External tools --
    #[error("{tool} is not installed. {hint}")]
    ExternalToolMissing { tool: String, hint: String },

    #[error("{tool} did not finish within {timeout:?}")]
    ExternalToolTimeout { tool: String, timeout: Duration },

    #[error("{tool} failed: {detail}")]
    ExternalToolFailed { tool: String, detail: String },

    #[error(
        "conversion output missing: expected {}, directory contains [{}]",
        expected.display(),
        listing.join(", ")
    )]
    ConversionOutputMissing {
        expected: PathBuf,
        listing: Vec<String>,
    },

    #[error("compression failed (external: {primary}; fallback: {fallback})")]
    CompressionFailed { primary: String, fallback: String },

    // -- Document libraries --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("archive creation failed: {0}")]
    Archive(String),

    #[error("background worker failed: {0}")]
    Worker(String),

    // -- Delivery --
    #[error("error streaming file: {0}")]
    Stream(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagewerkError>;
