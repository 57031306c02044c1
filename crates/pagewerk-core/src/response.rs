// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client-facing error responses.
//
// Every fatal job error maps to a status class and a JSON body carrying a
// short message plus the error's display text. Stack traces and internal
// paths beyond what the error already names never leave the process.

use serde::{Deserialize, Serialize};

use crate::error::PagewerkError;

/// Which side of the request/response boundary is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Bad input: rejected before any file I/O (4xx).
    Client,
    /// The pipeline or one of its tools failed (5xx).
    Server,
}

/// JSON body returned to the caller when a job fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP-equivalent status code.
    pub status: u16,
    /// Short summary, e.g. "Failed to merge PDFs".
    pub message: String,
    /// Display text of the underlying error.
    pub error: String,
    /// Whether resubmitting the same job might succeed.
    pub retriable: bool,
}

impl PagewerkError {
    /// Classify this error for the response boundary.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::Client,
            _ => ErrorClass::Server,
        }
    }

    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::Client => 400,
            ErrorClass::Server => 500,
        }
    }

    /// Timeouts are retryable at the job level; nothing retries them
    /// automatically.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::ExternalToolTimeout { .. } => true,
            Self::Io(io_err) => matches!(
                io_err.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

/// Build the response body for an error raised while running `operation`.
///
/// `operation` is the job's short name ("merge", "split", ...).
pub fn error_response(err: &PagewerkError, operation: &str) -> ErrorResponse {
    let message = match err {
        PagewerkError::Validation(_) => "Invalid request".to_string(),
        PagewerkError::Stream(_) => "Error streaming file".to_string(),
        PagewerkError::ExternalToolMissing { tool, .. } => {
            format!("{tool} is required for this operation")
        }
        _ => format!("Failed to {}", operation_phrase(operation)),
    };

    ErrorResponse {
        status: err.status_code(),
        message,
        error: err.to_string(),
        retriable: err.is_retriable(),
    }
}

fn operation_phrase(operation: &str) -> &str {
    match operation {
        "merge" => "merge PDFs",
        "split" => "split PDF",
        "compress" => "compress PDF",
        "convert" => "convert document",
        "rasterize" => "convert PDF to images",
        "inspect" => "read PDF",
        other => other,
    }
}
