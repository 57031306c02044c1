// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Resource ledger.
//
// Every path a job creates or takes ownership of is registered here. Release
// drains the ledger, so each path is removed at most once however many
// release paths fire (job error, stream EOF, stream drop, ledger drop).

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

/// What kind of filesystem entry a ledger path is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    /// Removed recursively.
    Directory,
}

#[derive(Debug, Clone)]
struct LedgerEntry {
    path: PathBuf,
    kind: ResourceKind,
}

/// Paths owned by one job.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock must not stop cleanup.
    fn entries(&self) -> MutexGuard<'_, Vec<LedgerEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take ownership of `path`.
    pub fn register(&self, path: impl Into<PathBuf>, kind: ResourceKind) {
        let path = path.into();
        debug!(path = %path.display(), ?kind, "Registered resource");
        self.entries().push(LedgerEntry { path, kind });
    }

    /// Paths still awaiting release, in registration order.
    pub fn tracked_paths(&self) -> Vec<PathBuf> {
        self.entries().iter().map(|e| e.path.clone()).collect()
    }

    pub fn is_released(&self) -> bool {
        self.entries().is_empty()
    }

    /// Remove every registered path. Returns how many paths are now gone.
    ///
    /// Files go first, then directories (deepest first). A path that no
    /// longer exists counts as released. Other failures are logged and do
    /// not stop the remaining paths.
    pub fn release_all(&self) -> usize {
        let mut drained: Vec<LedgerEntry> = std::mem::take(&mut *self.entries());
        if drained.is_empty() {
            return 0;
        }

        drained.sort_by_key(|e| match e.kind {
            ResourceKind::File => (0, 0),
            ResourceKind::Directory => (1, usize::MAX - e.path.components().count()),
        });

        let mut released = 0;
        for entry in &drained {
            let result = match entry.kind {
                ResourceKind::File => std::fs::remove_file(&entry.path),
                ResourceKind::Directory => std::fs::remove_dir_all(&entry.path),
            };
            match result {
                Ok(()) => released += 1,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => released += 1,
                Err(err) => {
                    warn!(path = %entry.path.display(), %err, "Failed to remove resource");
                }
            }
        }

        info!(released, total = drained.len(), "Released job resources");
        released
    }

    /// Release after `grace` has elapsed. Removal runs on the blocking pool.
    pub async fn release_after(self: Arc<Self>, grace: Duration) {
        tokio::time::sleep(grace).await;
        self.release_blocking().await;
    }

    /// [`release_all`](Self::release_all) on the blocking pool.
    pub async fn release_blocking(self: Arc<Self>) -> usize {
        let ledger = Arc::clone(&self);
        match tokio::task::spawn_blocking(move || ledger.release_all()).await {
            Ok(released) => released,
            Err(err) => {
                warn!(%err, "Release task failed; releasing inline");
                self.release_all()
            }
        }
    }
}

impl Drop for ResourceLedger {
    fn drop(&mut self) {
        let pending = self.entries().len();
        if pending > 0 {
            debug!(pending, "Ledger dropped with resources outstanding");
            self.release_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn releases_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("job");
        std::fs::create_dir_all(work.join("parts")).unwrap();
        std::fs::write(work.join("parts/page_1.pdf"), b"x").unwrap();
        let upload = dir.path().join("upload.pdf");
        std::fs::write(&upload, b"x").unwrap();

        let ledger = ResourceLedger::new();
        ledger.register(&work, ResourceKind::Directory);
        ledger.register(&upload, ResourceKind::File);
        ledger.register(work.join("parts/page_1.pdf"), ResourceKind::File);

        assert_eq!(ledger.release_all(), 3);
        assert!(!work.exists());
        assert!(!upload.exists());
        assert!(ledger.is_released());
    }

    #[test]
    fn second_release_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.pdf");
        std::fs::write(&file, b"x").unwrap();

        let ledger = ResourceLedger::new();
        ledger.register(&file, ResourceKind::File);
        assert_eq!(ledger.release_all(), 1);
        assert_eq!(ledger.release_all(), 0);
    }

    #[test]
    fn missing_paths_count_as_released() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ResourceLedger::new();
        ledger.register(dir.path().join("never-created.pdf"), ResourceKind::File);
        ledger.register(dir.path().join("never-created"), ResourceKind::Directory);
        assert_eq!(ledger.release_all(), 2);
    }

    #[test]
    fn one_failure_does_not_block_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_file = dir.path().join("subdir");
        std::fs::create_dir_all(&not_a_file).unwrap();
        let file = dir.path().join("b.pdf");
        std::fs::write(&file, b"x").unwrap();

        let ledger = ResourceLedger::new();
        // remove_file on a directory fails.
        ledger.register(&not_a_file, ResourceKind::File);
        ledger.register(&file, ResourceKind::File);

        assert_eq!(ledger.release_all(), 1);
        assert!(!file.exists());
    }

    #[test]
    fn drop_releases_outstanding_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("c.pdf");
        std::fs::write(&file, b"x").unwrap();
        {
            let ledger = ResourceLedger::new();
            ledger.register(&file, ResourceKind::File);
        }
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn delayed_release() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("d.pdf");
        std::fs::write(&file, b"x").unwrap();

        let ledger = Arc::new(ResourceLedger::new());
        ledger.register(&file, ResourceKind::File);
        let task = tokio::spawn(Arc::clone(&ledger).release_after(Duration::from_millis(20)));
        assert!(file.exists());
        task.await.unwrap();
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn blocking_release_removes_directory_trees() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("job");
        std::fs::create_dir_all(work.join("parts/deep")).unwrap();
        std::fs::write(work.join("parts/deep/split_1.pdf"), b"x").unwrap();

        let ledger = Arc::new(ResourceLedger::new());
        ledger.register(&work, ResourceKind::Directory);

        assert_eq!(Arc::clone(&ledger).release_blocking().await, 1);
        assert!(!work.exists());
        assert_eq!(ledger.release_blocking().await, 0);
    }
}
