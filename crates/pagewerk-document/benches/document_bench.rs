// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the pagewerk-document crate: page-range parsing,
// split planning, and image placement geometry.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use pagewerk_core::SplitStrategy;
use pagewerk_document::partition::plan_parts;
use pagewerk_document::pdf::writer::fit_centered;
use pagewerk_document::range;

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Parse a mix of valid, inverted, and out-of-bounds expressions against a
/// 500-page document.
fn bench_range_parse(c: &mut Criterion) {
    let exprs = ["1-250", "17", "300-120", "499-500", "abc", "1-2-3", "9999"];

    c.bench_function("range_parse (7 exprs, 500 pages)", |b| {
        b.iter(|| {
            for expr in exprs {
                black_box(range::parse(black_box(expr), 500));
            }
        });
    });
}

/// Plan an every-3-pages split of a 1000-page document.
fn bench_split_plan(c: &mut Criterion) {
    let strategy = SplitStrategy::EveryN(3);

    c.bench_function("plan_parts every_n(3) (1000 pages)", |b| {
        b.iter(|| black_box(plan_parts(black_box(&strategy), 1000)));
    });
}

/// Fit a handful of image sizes onto an A4 canvas.
fn bench_fit_geometry(c: &mut Criterion) {
    let sizes = [(100.0, 50.0), (4000.0, 3000.0), (595.0, 842.0), (1.0, 1000.0)];

    c.bench_function("fit_centered (4 images)", |b| {
        b.iter(|| {
            for (w, h) in sizes {
                black_box(fit_centered(black_box(w), black_box(h), 595.0, 842.0));
            }
        });
    });
}

criterion_group!(benches, bench_range_parse, bench_split_plan, bench_fit_geometry);
criterion_main!(benches);
