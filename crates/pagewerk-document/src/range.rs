// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-range expressions.
//
// A range expression is either `"<a>-<b>"` or a single `"<n>"`, 1-indexed and
// inclusive. Anything out of bounds, inverted, or non-numeric parses to an
// empty set; callers treat an empty set as "skip this unit".

use pagewerk_core::{PageRange, PagewerkError, Result};
use tracing::debug;

/// 0-indexed, ascending page indices.
pub type PageIndexSet = Vec<usize>;

/// Parse `expr` against a document of `total_pages` pages.
pub fn parse(expr: &str, total_pages: u32) -> PageIndexSet {
    match parse_range(expr, total_pages) {
        Some(range) => range.indices(),
        None => {
            debug!(expr, total_pages, "Range expression rejected");
            Vec::new()
        }
    }
}

/// Parse `expr` into a validated [`PageRange`], or `None` if it is unusable.
pub fn parse_range(expr: &str, total_pages: u32) -> Option<PageRange> {
    let tokens: Vec<&str> = expr.split('-').map(str::trim).collect();
    match tokens.as_slice() {
        [single] => PageRange::single(single.parse().ok()?, total_pages),
        [start, end] => PageRange::new(start.parse().ok()?, end.parse().ok()?, total_pages),
        _ => None,
    }
}

/// Split a comma-separated list such as `"1-3,5,7-10"` into expressions.
///
/// Only the shape of each token is checked here; bounds are applied later by
/// [`parse`] once the page count is known.
pub fn split_range_list(list: &str) -> Result<Vec<String>> {
    let exprs: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if exprs.is_empty() {
        return Err(PagewerkError::Validation(
            "at least one page range is required".into(),
        ));
    }
    for expr in &exprs {
        check_syntax(expr)?;
    }
    Ok(exprs)
}

/// Reject tokens that are not `digits` or `digits-digits`.
pub fn check_syntax(expr: &str) -> Result<()> {
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let ok = match expr.split_once('-') {
        Some((a, b)) => is_number(a.trim()) && is_number(b.trim()),
        None => is_number(expr.trim()),
    };
    if ok {
        Ok(())
    } else {
        Err(PagewerkError::Validation(format!(
            "invalid page range '{expr}' (expected e.g. 1-3 or 5)"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_range_expands_to_zero_indexed() {
        assert_eq!(parse("2-4", 10), vec![1, 2, 3]);
        assert_eq!(parse(" 1 - 1 ", 1), vec![0]);
        assert_eq!(parse("1-10", 10), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn single_page() {
        assert_eq!(parse("5", 10), vec![4]);
        assert!(parse("0", 10).is_empty());
        assert!(parse("11", 10).is_empty());
    }

    #[test]
    fn rejects_without_clamping() {
        assert!(parse("4-2", 10).is_empty());
        assert!(parse("8-12", 10).is_empty());
        assert!(parse("99", 10).is_empty());
        assert!(parse("1-2-3", 10).is_empty());
        assert!(parse("a-b", 10).is_empty());
        assert!(parse("", 10).is_empty());
        assert!(parse("-3", 10).is_empty());
    }

    #[test]
    fn range_list_checks_shape_only() {
        let exprs = split_range_list("1-3, 5 ,99").unwrap();
        assert_eq!(exprs, vec!["1-3", "5", "99"]);

        assert!(split_range_list(" , ").is_err());
        assert!(split_range_list("1-3,x").is_err());
        assert!(split_range_list("1-").is_err());
        assert!(split_range_list("1-2-3").is_err());
    }
}
