// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document partitioning (split).
//
// Planning is pure: `plan_parts` turns a strategy and a page count into named
// parts. `split` then copies each part into its own file, skipping parts that
// end up with no pages.

use std::path::{Path, PathBuf};

use pagewerk_core::SplitStrategy;
use pagewerk_core::error::{PagewerkError, Result};
use tracing::{debug, info, instrument};

use crate::outcome::{Attempts, UnitOutcome};
use crate::pdf::{PageCopier, PageSink, PdfReader};
use crate::range;

/// One output file of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartPlan {
    /// Unit label for logs and skip records.
    pub label: String,
    pub file_name: String,
    /// 0-indexed pages, in output order.
    pub indices: Vec<usize>,
}

/// Reject strategies that can never produce output, before any file I/O.
pub fn validate_strategy(strategy: &SplitStrategy) -> Result<()> {
    match strategy {
        SplitStrategy::EveryN(0) => Err(PagewerkError::Validation(
            "pages per split must be at least 1".into(),
        )),
        SplitStrategy::Ranges(ranges) if ranges.is_empty() => Err(PagewerkError::Validation(
            "at least one page range is required".into(),
        )),
        _ => Ok(()),
    }
}

/// Lay out the parts `strategy` yields for a `total_pages` document.
///
/// Range expressions that parse to nothing still get a part (with no pages)
/// so that numbering follows the request.
pub fn plan_parts(strategy: &SplitStrategy, total_pages: u32) -> Vec<PartPlan> {
    match strategy {
        SplitStrategy::Ranges(exprs) => exprs
            .iter()
            .enumerate()
            .map(|(i, expr)| PartPlan {
                label: format!("range {expr}"),
                file_name: format!("split_{}_pages_{}.pdf", i + 1, expr.replace('/', "-")),
                indices: range::parse(expr, total_pages),
            })
            .collect(),
        SplitStrategy::Individual => (0..total_pages as usize)
            .map(|i| PartPlan {
                label: format!("page {}", i + 1),
                file_name: format!("page_{}.pdf", i + 1),
                indices: vec![i],
            })
            .collect(),
        SplitStrategy::EveryN(n) => {
            let n = (*n).max(1) as usize;
            let total = total_pages as usize;
            (0..total)
                .step_by(n)
                .enumerate()
                .map(|(k, start)| {
                    let end = (start + n).min(total);
                    PartPlan {
                        label: format!("split {}", k + 1),
                        file_name: format!("split_{}_pages_{}-{}.pdf", k + 1, start + 1, end),
                        indices: (start..end).collect(),
                    }
                })
                .collect()
        }
    }
}

/// Split `input` into `out_dir` according to `strategy`.
///
/// Returns output paths in part order. A part is written only if at least one
/// of its pages was copied. Fails with
/// [`PagewerkError::NoOutputsProduced`] when no part was written.
#[instrument(skip_all, fields(input = %input.display(), strategy = ?strategy))]
pub fn split(input: &Path, strategy: &SplitStrategy, out_dir: &Path) -> Result<Attempts<PathBuf>> {
    validate_strategy(strategy)?;

    let reader = PdfReader::open(input)?;
    let total = reader.page_count();
    let plans = plan_parts(strategy, total);
    info!(total_pages = total, parts = plans.len(), "Splitting PDF");

    let mut attempts = Attempts::new();
    for plan in plans {
        attempts.record(write_part(&reader, &plan, out_dir));
    }

    let attempts = attempts.require_any(match strategy {
        SplitStrategy::Individual => "No valid pages could be extracted",
        _ => "No valid pages could be split",
    })?;

    info!(
        written = attempts.successes.len(),
        skipped = attempts.skips.len(),
        "Split complete"
    );
    Ok(attempts)
}

fn write_part(reader: &PdfReader, plan: &PartPlan, out_dir: &Path) -> UnitOutcome<PathBuf> {
    if plan.indices.is_empty() {
        return UnitOutcome::from_result(
            plan.label.clone(),
            Err(PagewerkError::Validation(
                "range is empty or outside the document".into(),
            )),
        );
    }

    let mut sink = PageSink::new();
    let mut copier = PageCopier::new(reader.document());
    for &index in &plan.indices {
        let copied = reader
            .page_id(index)
            .ok_or_else(|| PagewerkError::PdfError(format!("page {} not found", index + 1)))
            .and_then(|page_id| copier.copy_page(page_id, &mut sink));
        // Page-level failures shrink the part; they do not discard it.
        if let UnitOutcome::Skipped(skip) =
            UnitOutcome::from_result(format!("{} page {}", plan.label, index + 1), copied)
        {
            debug!(%skip, "Page left out of part");
        }
    }

    if sink.is_empty() {
        return UnitOutcome::skipped(plan.label.clone(), "no pages could be copied");
    }

    let path = out_dir.join(&plan.file_name);
    let saved = sink.save(&path).map(|pages| {
        debug!(file = %plan.file_name, pages, "Part written");
        path
    });
    UnitOutcome::from_result(plan.label.clone(), saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn every_n_chunks_with_short_tail() {
        let plans = plan_parts(&SplitStrategy::EveryN(3), 10);
        let sizes: Vec<usize> = plans.iter().map(|p| p.indices.len()).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
        assert_eq!(plans[3].file_name, "split_4_pages_10-10.pdf");
        assert_eq!(plans[1].file_name, "split_2_pages_4-6.pdf");
    }

    #[test]
    fn range_names_follow_request_order() {
        let strategy = SplitStrategy::Ranges(vec!["1-3".into(), "99".into(), "5".into()]);
        let plans = plan_parts(&strategy, 10);
        assert_eq!(plans[0].file_name, "split_1_pages_1-3.pdf");
        assert!(plans[1].indices.is_empty());
        assert_eq!(plans[2].file_name, "split_3_pages_5.pdf");
        assert_eq!(plans[2].indices, vec![4]);
    }

    #[test]
    fn zero_chunk_size_is_rejected_before_io() {
        let err = split(
            Path::new("/nonexistent/input.pdf"),
            &SplitStrategy::EveryN(0),
            Path::new("/nonexistent"),
        )
        .unwrap_err();
        assert!(matches!(err, PagewerkError::Validation(_)));
    }

    #[test]
    fn ranges_skip_out_of_bounds_expressions() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        fixtures::write_sample_pdf(&input, 10).unwrap();

        let strategy = SplitStrategy::Ranges(vec!["1-3".into(), "99".into(), "5".into()]);
        let attempts = split(&input, &strategy, dir.path()).unwrap();

        assert_eq!(attempts.successes.len(), 2);
        assert_eq!(attempts.skips.len(), 1);
        assert_eq!(
            PdfReader::open(&attempts.successes[0]).unwrap().page_count(),
            3
        );
        assert!(dir.path().join("split_3_pages_5.pdf").exists());
    }

    #[test]
    fn every_n_writes_short_tail_part() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        fixtures::write_sample_pdf(&input, 10).unwrap();

        let attempts = split(&input, &SplitStrategy::EveryN(3), dir.path()).unwrap();
        let counts: Vec<u32> = attempts
            .successes
            .iter()
            .map(|p| PdfReader::open(p).unwrap().page_count())
            .collect();
        assert_eq!(counts, vec![3, 3, 3, 1]);
        assert!(attempts.skips.is_empty());
        assert_eq!(
            attempts.successes[3],
            dir.path().join("split_4_pages_10-10.pdf")
        );
    }

    #[test]
    fn unreadable_page_shrinks_its_part() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        fixtures::write_sample_pdf(&input, 3).unwrap();

        let mut reader = PdfReader::open(&input).unwrap();
        let broken = reader.page_id(1).unwrap();
        reader
            .document_mut()
            .objects
            .insert(broken, lopdf::Object::Integer(0));

        let plan = PartPlan {
            label: "range 1-3".into(),
            file_name: "split_1_pages_1-3.pdf".into(),
            indices: vec![0, 1, 2],
        };
        let UnitOutcome::Done(path) = write_part(&reader, &plan, dir.path()) else {
            panic!("part should survive a single bad page");
        };
        assert_eq!(PdfReader::open(&path).unwrap().page_count(), 2);
    }

    #[test]
    fn individual_pages() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        fixtures::write_sample_pdf(&input, 3).unwrap();

        let attempts = split(&input, &SplitStrategy::Individual, dir.path()).unwrap();
        let names: Vec<String> = attempts
            .successes
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page_1.pdf", "page_2.pdf", "page_3.pdf"]);
    }

    #[test]
    fn all_ranges_invalid_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        fixtures::write_sample_pdf(&input, 2).unwrap();

        let strategy = SplitStrategy::Ranges(vec!["5-9".into(), "2-1".into()]);
        let err = split(&input, &strategy, dir.path()).unwrap_err();
        assert!(matches!(err, PagewerkError::NoOutputsProduced(_)));
    }
}
