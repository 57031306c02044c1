// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-unit outcomes.
//
// Operations that loop over units (pages, files, images) record each unit as
// either done or skipped instead of aborting. The caller decides whether an
// all-skipped result is fatal.

use std::fmt;
use std::path::Path;

use pagewerk_core::{PagewerkError, Result};
use serde::Serialize;
use tracing::warn;

/// A unit that was left out of the result, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedUnit {
    /// Human-readable unit label, e.g. `page 3` or `scan.heic`.
    pub unit: String,
    pub reason: String,
}

impl fmt::Display for SkippedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.reason)
    }
}

/// Unit label for a file: its base name, or the full path if it has none.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Result of processing one unit.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome<T> {
    Done(T),
    Skipped(SkippedUnit),
}

impl<T> UnitOutcome<T> {
    pub fn skipped(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Skipped(SkippedUnit {
            unit: unit.into(),
            reason: reason.into(),
        })
    }

    /// Turn a unit-level `Result` into an outcome, logging the skip.
    pub fn from_result(unit: impl Into<String>, result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Done(value),
            Err(err) => {
                let unit = unit.into();
                warn!(unit = %unit, %err, "Skipping unit");
                Self::skipped(unit, err.to_string())
            }
        }
    }
}

/// Aggregated outcomes of a unit loop, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempts<T> {
    pub successes: Vec<T>,
    pub skips: Vec<SkippedUnit>,
}

impl<T> Default for Attempts<T> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            skips: Vec::new(),
        }
    }
}

impl<T> Attempts<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: UnitOutcome<T>) {
        match outcome {
            UnitOutcome::Done(value) => self.successes.push(value),
            UnitOutcome::Skipped(skip) => self.skips.push(skip),
        }
    }

    /// Fail with [`PagewerkError::NoOutputsProduced`] when nothing succeeded.
    pub fn require_any(self, message: &str) -> Result<Self> {
        if self.successes.is_empty() {
            let detail = if self.skips.is_empty() {
                message.to_string()
            } else {
                let reasons: Vec<String> = self.skips.iter().map(ToString::to_string).collect();
                format!("{message} ({})", reasons.join("; "))
            };
            return Err(PagewerkError::NoOutputsProduced(detail));
        }
        Ok(self)
    }
}

impl<T> FromIterator<UnitOutcome<T>> for Attempts<T> {
    fn from_iter<I: IntoIterator<Item = UnitOutcome<T>>>(iter: I) -> Self {
        let mut attempts = Self::new();
        for outcome in iter {
            attempts.record(outcome);
        }
        attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_in_order() {
        let attempts: Attempts<u32> = vec![
            UnitOutcome::Done(1),
            UnitOutcome::skipped("page 2", "broken"),
            UnitOutcome::Done(3),
        ]
        .into_iter()
        .collect();

        assert_eq!(attempts.successes, vec![1, 3]);
        assert_eq!(attempts.skips.len(), 1);
        assert_eq!(attempts.skips[0].to_string(), "page 2: broken");
    }

    #[test]
    fn require_any_fails_when_everything_skipped() {
        let attempts: Attempts<u32> = vec![UnitOutcome::from_result(
            "page 1",
            Err(PagewerkError::PdfError("bad xref".into())),
        )]
        .into_iter()
        .collect();

        let err = attempts.require_any("No valid pages could be split").unwrap_err();
        match err {
            PagewerkError::NoOutputsProduced(msg) => {
                assert!(msg.starts_with("No valid pages could be split"));
                assert!(msg.contains("bad xref"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
