// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document assembly (merge).

use std::path::{Path, PathBuf};

use pagewerk_core::error::{PagewerkError, Result};
use serde::Serialize;
use tracing::{info, instrument};

use crate::outcome::{Attempts, SkippedUnit, UnitOutcome, file_label};
use crate::pdf::{PageCopier, PageSink, PdfReader};

/// What a merge produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeReport {
    pub page_count: usize,
    /// Input files that failed to open and pages that failed to copy.
    pub skipped: Vec<SkippedUnit>,
}

/// Concatenate every page of `inputs`, in order, into `output`.
///
/// Unreadable files and uncopyable pages are skipped. Fails with
/// [`PagewerkError::NoValidContent`] when nothing was copied, in which case
/// `output` is not written.
#[instrument(skip_all, fields(inputs = inputs.len(), output = %output.display()))]
pub fn merge(inputs: &[PathBuf], output: &Path) -> Result<MergeReport> {
    let mut sink = PageSink::new();
    let mut attempts: Attempts<()> = Attempts::new();

    for path in inputs {
        let label = file_label(path);
        let reader = match PdfReader::open(path) {
            Ok(reader) => reader,
            Err(err) => {
                attempts.record(UnitOutcome::from_result(label, Err(err)));
                continue;
            }
        };

        let mut copier = PageCopier::new(reader.document());
        for (index, page_id) in reader.page_ids().iter().enumerate() {
            let unit = format!("{} page {}", label, index + 1);
            attempts.record(UnitOutcome::from_result(
                unit,
                copier.copy_page(*page_id, &mut sink),
            ));
        }
        info!(file = %label, pages = reader.page_count(), "Appended input");
    }

    if sink.is_empty() {
        return Err(PagewerkError::NoValidContent(
            "No valid pages to merge".into(),
        ));
    }

    let page_count = sink.save(output)?;
    info!(page_count, skipped = attempts.skips.len(), "Merge complete");
    Ok(MergeReport {
        page_count,
        skipped: attempts.skips,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn unreadable_input_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        let c = dir.path().join("c.pdf");
        fixtures::write_sample_pdf(&a, 3).unwrap();
        fixtures::write_garbage(&b).unwrap();
        fixtures::write_sample_pdf(&c, 2).unwrap();

        let output = dir.path().join("merged.pdf");
        let report = merge(&[a, b, c], &output).unwrap();

        assert_eq!(report.page_count, 5);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].unit, "b.pdf");
        assert_eq!(PdfReader::open(&output).unwrap().page_count(), 5);
    }

    #[test]
    fn nothing_readable_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        fixtures::write_garbage(&a).unwrap();

        let output = dir.path().join("merged.pdf");
        let err = merge(&[a, dir.path().join("missing.pdf")], &output).unwrap_err();
        assert!(matches!(err, PagewerkError::NoValidContent(_)));
        assert!(!output.exists());
    }

    #[test]
    fn preserves_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.pdf");
        let two = dir.path().join("two.pdf");
        fixtures::write_sample_pdf(&one, 1).unwrap();
        fixtures::write_sample_pdf(&two, 2).unwrap();

        let output = dir.path().join("merged.pdf");
        merge(&[two, one], &output).unwrap();

        let merged = PdfReader::open(&output).unwrap();
        let labels: Vec<String> = merged
            .page_ids()
            .iter()
            .map(|&id| {
                let content = merged.document().get_page_content(id).unwrap();
                let text = String::from_utf8_lossy(&content).into_owned();
                ["Page 1", "Page 2"]
                    .into_iter()
                    .find(|label| text.contains(label))
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(labels, vec!["Page 1", "Page 2", "Page 1"]);
    }
}
