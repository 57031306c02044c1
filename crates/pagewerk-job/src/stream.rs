// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Streamed artifact delivery.
//
// Cleanup is tied to the stream, not to the function that produced the
// artifact: EOF schedules release after a grace delay, a read error releases
// at once, and dropping an unfinished stream schedules release as well.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use pagewerk_core::error::{PagewerkError, Result};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::ledger::ResourceLedger;

/// A readable artifact that cleans up its job when delivery ends.
#[derive(Debug)]
pub struct ArtifactStream {
    file: File,
    path: PathBuf,
    ledger: Arc<ResourceLedger>,
    grace: Duration,
    finished: bool,
}

impl ArtifactStream {
    /// Open `path` for delivery. If it cannot be opened the ledger is
    /// released immediately.
    pub async fn open(path: PathBuf, ledger: Arc<ResourceLedger>, grace: Duration) -> Result<Self> {
        match File::open(&path).await {
            Ok(file) => Ok(Self {
                file,
                path,
                ledger,
                grace,
                finished: false,
            }),
            Err(err) => {
                warn!(path = %path.display(), %err, "Cannot open artifact");
                ledger.release_all();
                Err(PagewerkError::Stream(format!("cannot open artifact: {err}")))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy the whole artifact into `writer` and flush it.
    ///
    /// Any read or write failure releases the job's resources immediately.
    pub async fn deliver_to<W>(mut self, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let copied = tokio::io::copy(&mut self, writer).await;
        let delivered = match copied {
            Ok(bytes) => writer.flush().await.map(|()| bytes),
            Err(err) => Err(err),
        };
        match delivered {
            Ok(bytes) => {
                debug!(bytes, "Artifact delivered");
                Ok(bytes)
            }
            Err(err) => {
                warn!(%err, "Artifact delivery failed");
                self.finished = true;
                Arc::clone(&self.ledger).release_blocking().await;
                Err(PagewerkError::Stream(err.to_string()))
            }
        }
    }

    fn finish(&mut self, delay: Option<Duration>) {
        if self.finished {
            return;
        }
        self.finished = true;
        schedule_release(Arc::clone(&self.ledger), delay);
    }
}

fn schedule_release(ledger: Arc<ResourceLedger>, delay: Option<Duration>) {
    match (delay, Handle::try_current()) {
        (Some(delay), Ok(handle)) => {
            handle.spawn(ledger.release_after(delay));
        }
        (None, Ok(handle)) => {
            handle.spawn_blocking(move || ledger.release_all());
        }
        (_, Err(_)) => {
            ledger.release_all();
        }
    }
}

impl AsyncRead for ArtifactStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();

        match Pin::new(&mut this.file).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                // Nothing read into a buffer with room left means EOF.
                if buf.filled().len() == before && buf.remaining() > 0 {
                    debug!(path = %this.path.display(), "Artifact fully read");
                    let grace = this.grace;
                    this.finish(Some(grace));
                }
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(err)) => {
                warn!(path = %this.path.display(), %err, "Artifact read failed");
                this.finish(None);
                Poll::Ready(Err(err))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ArtifactStream {
    fn drop(&mut self) {
        if !self.finished {
            debug!(path = %self.path.display(), "Artifact stream dropped before EOF");
            self.finish(None);
        }
    }
}
