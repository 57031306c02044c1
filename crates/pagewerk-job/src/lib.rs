// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagewerk Job: runs one document operation per job and guarantees that
// every file the job touched is removed exactly once, whether the job fails,
// its artifact is streamed to the end, or the stream is abandoned.

pub mod job;
pub mod ledger;
pub mod stream;

pub use job::{ArtifactSummary, Job, JobArtifact};
pub use ledger::{ResourceKind, ResourceLedger};
pub use stream::ArtifactStream;
