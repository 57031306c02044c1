// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job orchestration.
//
// A job owns its uploaded inputs and a working directory named after its id.
// Both are registered with the job's ledger as soon as the job exists. A job
// that fails releases the ledger before returning; a job that succeeds hands
// the ledger to its artifact, whose delivery releases it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::{DocumentFormat, JobId, Operation, PipelineConfig, SplitStrategy, UploadedFile};
use pagewerk_document::pdf::DocumentMetadata;
use pagewerk_document::{
    CompressionEngine, CompressionStats, OfficeConversion, OfficeConverter, PdfWriter, Rasterizer,
    SkippedUnit, bundle, merge, partition, range, split,
};
use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::ledger::{ResourceKind, ResourceLedger};
use crate::stream::ArtifactStream;

const ZIP_MIME: &str = "application/zip";

/// The deliverable of a successful job.
///
/// Holds the job's ledger: nothing is cleaned up until the artifact is
/// streamed, released, or dropped.
#[derive(Debug)]
pub struct JobArtifact {
    pub path: PathBuf,
    pub content_type: String,
    /// Suggested filename for the download, e.g. `merged-1718000000000.pdf`.
    pub download_name: String,
    pub size: u64,
    pub stats: Option<CompressionStats>,
    /// Units left out of the result.
    pub skipped: Vec<SkippedUnit>,
    ledger: Arc<ResourceLedger>,
}

/// Serialisable summary of an artifact, for logs and API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub download_name: String,
    pub content_type: String,
    pub size: u64,
    pub stats: Option<CompressionStats>,
    pub skipped: Vec<SkippedUnit>,
}

impl JobArtifact {
    pub fn ledger(&self) -> &Arc<ResourceLedger> {
        &self.ledger
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            download_name: self.download_name.clone(),
            content_type: self.content_type.clone(),
            size: self.size,
            stats: self.stats,
            skipped: self.skipped.clone(),
        }
    }

    /// Open the artifact for streaming. Cleanup follows the stream.
    pub async fn into_stream(self, grace: Duration) -> Result<ArtifactStream> {
        ArtifactStream::open(self.path, self.ledger, grace).await
    }

    /// Discard the artifact without delivering it.
    pub fn release(self) {
        self.ledger.release_all();
    }
}

/// One pipeline invocation.
pub struct Job {
    id: JobId,
    operation: Operation,
    inputs: Vec<PathBuf>,
    work_dir: PathBuf,
    ledger: Arc<ResourceLedger>,
    config: PipelineConfig,
}

impl Job {
    /// Check `operation` against the number of inputs. No file I/O happens
    /// here.
    pub fn validate(operation: &Operation, input_count: usize) -> Result<()> {
        let require = |ok: bool, message: &str| {
            if ok {
                Ok(())
            } else {
                Err(PagewerkError::Validation(message.to_string()))
            }
        };

        match operation {
            Operation::Merge => require(input_count >= 2, "merge needs at least two PDF files"),
            Operation::Split { strategy } => {
                require(input_count == 1, "split takes exactly one PDF file")?;
                partition::validate_strategy(strategy)?;
                if let SplitStrategy::Ranges(exprs) = strategy {
                    for expr in exprs {
                        range::check_syntax(expr)?;
                    }
                }
                Ok(())
            }
            Operation::Compress { .. } => require(input_count == 1, "compress takes exactly one PDF file"),
            Operation::Rasterize { quality, .. } => {
                require(input_count == 1, "rasterize takes exactly one PDF file")?;
                Rasterizer::validate_quality(*quality)
            }
            Operation::Convert { source, target } => match (source, target) {
                (DocumentFormat::Image, DocumentFormat::Pdf) => {
                    require(input_count >= 1, "at least one image is required")
                }
                _ => {
                    OfficeConversion::from_formats(*source, *target).ok_or_else(|| {
                        PagewerkError::Validation(format!(
                            "unsupported conversion {:?} -> {:?}",
                            source, target
                        ))
                    })?;
                    require(input_count == 1, "convert takes exactly one file")
                }
            },
        }
    }

    /// Create a job over uploaded files, taking ownership of them.
    ///
    /// The uploads are registered with the job's ledger before validation,
    /// so an invalid request still has its files removed.
    pub fn new(operation: Operation, uploads: Vec<UploadedFile>, config: PipelineConfig) -> Result<Self> {
        Self::with_id(JobId::new(), operation, uploads, config)
    }

    fn with_id(
        id: JobId,
        operation: Operation,
        uploads: Vec<UploadedFile>,
        config: PipelineConfig,
    ) -> Result<Self> {
        let ledger = Arc::new(ResourceLedger::new());
        for upload in &uploads {
            ledger.register(&upload.source_path, ResourceKind::File);
        }
        let work_dir = config.temp_root.join(id.to_string());
        ledger.register(&work_dir, ResourceKind::Directory);

        if let Err(err) = Self::validate(&operation, uploads.len()) {
            ledger.release_all();
            return Err(err);
        }

        debug!(job_id = %id, operation = operation.name(), inputs = uploads.len(), "Job created");
        Ok(Self {
            id,
            operation,
            inputs: uploads.into_iter().map(|u| u.source_path).collect(),
            work_dir,
            ledger,
            config,
        })
    }

    /// Create a job over local files the caller keeps.
    ///
    /// Each file is copied into the job's working directory first, so cleanup
    /// never touches the originals.
    pub fn from_local_files(
        operation: Operation,
        paths: &[PathBuf],
        config: PipelineConfig,
    ) -> Result<Self> {
        Self::validate(&operation, paths.len())?;

        let id = JobId::new();
        let job_root = config.temp_root.join(id.to_string());
        let uploads = match stage_local_files(paths, &job_root.join("inputs")) {
            Ok(uploads) => uploads,
            Err(err) => {
                let cleanup = ResourceLedger::new();
                cleanup.register(&job_root, ResourceKind::Directory);
                cleanup.release_all();
                return Err(err);
            }
        };
        Self::with_id(id, operation, uploads, config)
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn ledger(&self) -> &Arc<ResourceLedger> {
        &self.ledger
    }

    /// Run the operation to completion.
    ///
    /// On failure every registered path is released before the error is
    /// returned.
    #[instrument(skip_all, fields(job_id = %self.id, operation = self.operation.name()))]
    pub async fn run(self) -> Result<JobArtifact> {
        match self.execute().await {
            Ok(artifact) => {
                info!(
                    download = %artifact.download_name,
                    size = artifact.size,
                    skipped = artifact.skipped.len(),
                    "Job complete"
                );
                Ok(artifact)
            }
            Err(err) => {
                error!(%err, "Job failed");
                self.ledger.release_all();
                Err(err)
            }
        }
    }

    async fn execute(&self) -> Result<JobArtifact> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let millis = Utc::now().timestamp_millis();

        match &self.operation {
            Operation::Merge => {
                let output = self.work_dir.join("merged.pdf");
                let (inputs, out) = (self.inputs.clone(), output.clone());
                let report = blocking(move || merge(&inputs, &out)).await?;
                self.artifact(
                    output,
                    DocumentFormat::Pdf.mime_type(),
                    format!("merged-{millis}.pdf"),
                    None,
                    report.skipped,
                )
                .await
            }
            Operation::Split { strategy } => {
                let parts_dir = self.work_dir.join("parts");
                tokio::fs::create_dir_all(&parts_dir).await?;
                let (input, strategy) = (self.single_input()?.to_path_buf(), strategy.clone());
                let attempts = blocking(move || split(&input, &strategy, &parts_dir)).await?;

                let archive = self.work_dir.join("split.zip");
                let (files, out) = (attempts.successes.clone(), archive.clone());
                blocking(move || bundle(&files, &out)).await?;
                self.artifact(archive, ZIP_MIME, format!("split-{millis}.zip"), None, attempts.skips)
                    .await
            }
            Operation::Compress { profile, options } => {
                let output = self.work_dir.join("compressed.pdf");
                let stats = CompressionEngine::from_config(&self.config)
                    .compress(self.single_input()?, &output, *profile, *options)
                    .await?;
                self.artifact(
                    output,
                    DocumentFormat::Pdf.mime_type(),
                    format!("compressed-{millis}.pdf"),
                    Some(stats),
                    Vec::new(),
                )
                .await
            }
            Operation::Rasterize {
                image_format,
                quality,
            } => {
                let images_dir = self.work_dir.join("images");
                let attempts = Rasterizer::from_config(&self.config)
                    .rasterize(self.single_input()?, &images_dir, *image_format, *quality)
                    .await?;

                // A single page is delivered as the image itself.
                if let [only] = attempts.successes.as_slice() {
                    return self
                        .artifact(
                            only.clone(),
                            image_format.mime_type(),
                            format!("images-{millis}.{}", image_format.extension()),
                            None,
                            attempts.skips,
                        )
                        .await;
                }

                let archive = self.work_dir.join("images.zip");
                let (files, out) = (attempts.successes.clone(), archive.clone());
                blocking(move || bundle(&files, &out)).await?;
                self.artifact(archive, ZIP_MIME, format!("images-{millis}.zip"), None, attempts.skips)
                    .await
            }
            Operation::Convert { source, target } => {
                let download = format!("converted-{millis}.{}", target.extension());
                if let (DocumentFormat::Image, DocumentFormat::Pdf) = (source, target) {
                    let output = self.work_dir.join("converted.pdf");
                    let writer = PdfWriter::new(self.config.page_size);
                    let (images, out) = (self.inputs.clone(), output.clone());
                    let attempts = blocking(move || writer.images_to_pdf(&images, &out)).await?;
                    return self
                        .artifact(output, target.mime_type(), download, None, attempts.skips)
                        .await;
                }

                let conversion = OfficeConversion::from_formats(*source, *target).ok_or_else(|| {
                    PagewerkError::Validation(format!("unsupported conversion {:?} -> {:?}", source, target))
                })?;
                let output = self.work_dir.join(format!("converted.{}", target.extension()));
                let profile_dir = self.work_dir.join("office-profile");
                self.ledger.register(&profile_dir, ResourceKind::Directory);

                OfficeConverter::from_config(&self.config)
                    .convert(conversion, self.single_input()?, &output, &profile_dir)
                    .await?;
                self.artifact(output, target.mime_type(), download, None, Vec::new())
                    .await
            }
        }
    }

    fn single_input(&self) -> Result<&Path> {
        match self.inputs.as_slice() {
            [only] => Ok(only),
            _ => Err(PagewerkError::Validation(format!(
                "{} takes exactly one input",
                self.operation.name()
            ))),
        }
    }

    async fn artifact(
        &self,
        path: PathBuf,
        content_type: &str,
        download_name: String,
        stats: Option<CompressionStats>,
        skipped: Vec<SkippedUnit>,
    ) -> Result<JobArtifact> {
        let size = tokio::fs::metadata(&path).await?.len();
        Ok(JobArtifact {
            path,
            content_type: content_type.to_string(),
            download_name,
            size,
            stats,
            skipped,
            ledger: Arc::clone(&self.ledger),
        })
    }

    /// Read an uploaded PDF's metadata, then release it.
    #[instrument(skip_all, fields(file = %upload.original_name))]
    pub async fn inspect(upload: UploadedFile) -> Result<DocumentMetadata> {
        let ledger = ResourceLedger::new();
        ledger.register(&upload.source_path, ResourceKind::File);

        let path = upload.source_path.clone();
        let result =
            blocking(move || pagewerk_document::pdf::extract_metadata(&path)).await;
        ledger.release_all();
        result
    }
}

/// Copy `paths` into `staging` as uploads, prefixing each name with its
/// position so equal names cannot collide.
fn stage_local_files(paths: &[PathBuf], staging: &Path) -> Result<Vec<UploadedFile>> {
    std::fs::create_dir_all(staging)?;

    let mut uploads = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PagewerkError::Validation(format!("not a file: {}", path.display())))?;
        let staged = staging.join(format!("{}_{}", index + 1, original_name));
        let size_bytes = std::fs::copy(path, &staged).map_err(|err| {
            PagewerkError::Validation(format!("cannot read {}: {}", path.display(), err))
        })?;
        let mime_type = Path::new(&original_name)
            .extension()
            .and_then(|e| DocumentFormat::from_extension(&e.to_string_lossy()))
            .map_or("application/octet-stream", |f| f.mime_type())
            .to_string();
        uploads.push(UploadedFile {
            source_path: staged,
            original_name,
            mime_type,
            size_bytes,
        });
    }
    Ok(uploads)
}

/// Run blocking document work off the async runtime.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| PagewerkError::Worker(format!("document task failed: {err}")))?
}
