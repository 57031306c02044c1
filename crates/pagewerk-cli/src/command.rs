// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommands and their mapping onto pipeline jobs.
//
// Local files are staged into the job's working directory before the job
// runs, so cleanup only ever removes copies.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use pagewerk_core::{
    CompressionOptions, CompressionProfile, DocumentFormat, ImageFormat, Operation, PagewerkError,
    PipelineConfig, Result, SplitStrategy,
};
use pagewerk_document::convert::raster::DEFAULT_QUALITY;
use pagewerk_document::pdf::extract_metadata;
use pagewerk_document::range;
use pagewerk_job::{Job, JobArtifact};
use tracing::{info, warn};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Merge two or more PDFs in the order given
    Merge {
        /// Input PDF files
        #[arg(value_name = "FILE", num_args = 2.., required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Split a PDF by ranges, into single pages, or into fixed-size chunks
    Split {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        strategy: SplitArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Reduce the size of a PDF
    Compress {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Quality tier
        #[arg(long, value_enum, default_value = "medium")]
        profile: ProfileArg,

        /// Clear title, author, and the other information fields
        #[arg(long)]
        strip_metadata: bool,

        /// Leave embedded images at their original resolution
        #[arg(long)]
        keep_images: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Render each page of a PDF to an image
    Rasterize {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Image format
        #[arg(long, value_enum, default_value = "png")]
        format: ImageArg,

        /// Quality (1-100); the render resolution is three times this value
        #[arg(long, default_value_t = DEFAULT_QUALITY)]
        quality: u8,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Convert between PDF and DOCX using LibreOffice
    Convert {
        /// Input file (.pdf or .docx)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Target format
        #[arg(long, value_enum)]
        to: TargetArg,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Build a PDF with one page per image
    ImagesToPdf {
        /// Input PNG or JPEG files
        #[arg(value_name = "FILE", num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show document information as JSON
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output file (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct SplitArgs {
    /// Comma-separated page ranges, e.g. "1-3,5,7-10"
    #[arg(long, value_name = "RANGES")]
    ranges: Option<String>,

    /// One file per page
    #[arg(long)]
    individual: bool,

    /// Chunks of N pages
    #[arg(long, value_name = "N")]
    every: Option<u32>,
}

impl SplitArgs {
    fn strategy(&self) -> Result<SplitStrategy> {
        if let Some(list) = &self.ranges {
            return Ok(SplitStrategy::Ranges(range::split_range_list(list)?));
        }
        Ok(match self.every {
            Some(n) => SplitStrategy::EveryN(n),
            None => SplitStrategy::Individual,
        })
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProfileArg {
    Low,
    Medium,
    High,
}

impl From<ProfileArg> for CompressionProfile {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::Low => Self::Low,
            ProfileArg::Medium => Self::Medium,
            ProfileArg::High => Self::High,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ImageArg {
    Png,
    Jpg,
    Jpeg,
}

impl From<ImageArg> for ImageFormat {
    fn from(value: ImageArg) -> Self {
        match value {
            ImageArg::Png => Self::Png,
            ImageArg::Jpg => Self::Jpg,
            ImageArg::Jpeg => Self::Jpeg,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TargetArg {
    Pdf,
    Docx,
}

impl From<TargetArg> for DocumentFormat {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::Pdf => Self::Pdf,
            TargetArg::Docx => Self::Docx,
        }
    }
}

/// What a parsed command asks for.
#[derive(Debug)]
pub enum Plan {
    Job {
        operation: Operation,
        inputs: Vec<PathBuf>,
        output: Option<PathBuf>,
    },
    Info {
        input: PathBuf,
        compact: bool,
    },
}

impl Command {
    /// Operation name used in error responses.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Merge { .. } => "merge",
            Self::Split { .. } => "split",
            Self::Compress { .. } => "compress",
            Self::Rasterize { .. } => "rasterize",
            Self::Convert { .. } | Self::ImagesToPdf { .. } => "convert",
            Self::Info { .. } => "inspect",
        }
    }

    pub fn plan(self) -> Result<Plan> {
        let job = |operation, inputs, output: OutputArgs| Plan::Job {
            operation,
            inputs,
            output: output.output,
        };

        Ok(match self {
            Self::Merge { inputs, output } => job(Operation::Merge, inputs, output),
            Self::Split {
                input,
                strategy,
                output,
            } => job(
                Operation::Split {
                    strategy: strategy.strategy()?,
                },
                vec![input],
                output,
            ),
            Self::Compress {
                input,
                profile,
                strip_metadata,
                keep_images,
                output,
            } => job(
                Operation::Compress {
                    profile: profile.into(),
                    options: CompressionOptions {
                        strip_images: !keep_images,
                        strip_metadata,
                    },
                },
                vec![input],
                output,
            ),
            Self::Rasterize {
                input,
                format,
                quality,
                output,
            } => job(
                Operation::Rasterize {
                    image_format: format.into(),
                    quality,
                },
                vec![input],
                output,
            ),
            Self::Convert { input, to, output } => {
                let source = source_format(&input)?;
                job(
                    Operation::Convert {
                        source,
                        target: to.into(),
                    },
                    vec![input],
                    output,
                )
            }
            Self::ImagesToPdf { inputs, output } => job(
                Operation::Convert {
                    source: DocumentFormat::Image,
                    target: DocumentFormat::Pdf,
                },
                inputs,
                output,
            ),
            Self::Info { input, compact } => Plan::Info { input, compact },
        })
    }
}

fn source_format(path: &Path) -> Result<DocumentFormat> {
    path.extension()
        .and_then(|ext| DocumentFormat::from_extension(&ext.to_string_lossy()))
        .ok_or_else(|| {
            PagewerkError::Validation(format!("cannot tell the format of {}", path.display()))
        })
}

/// Run `command` to completion.
pub async fn execute(command: Command, config: PipelineConfig) -> Result<()> {
    match command.plan()? {
        Plan::Info { input, compact } => {
            let metadata = tokio::task::spawn_blocking(move || extract_metadata(&input))
                .await
                .map_err(|err| PagewerkError::Worker(format!("inspect task failed: {err}")))??;
            let json = if compact {
                serde_json::to_string(&metadata)?
            } else {
                serde_json::to_string_pretty(&metadata)?
            };
            println!("{json}");
            Ok(())
        }
        Plan::Job {
            operation,
            inputs,
            output,
        } => run_job(operation, &inputs, output.as_deref(), config).await,
    }
}

async fn run_job(
    operation: Operation,
    inputs: &[PathBuf],
    output: Option<&Path>,
    config: PipelineConfig,
) -> Result<()> {
    let grace = config.stream_grace();
    let artifact = Job::from_local_files(operation, inputs, config)?.run().await?;
    let ledger = Arc::clone(artifact.ledger());

    for skip in &artifact.skipped {
        warn!(%skip, "Left out of the result");
    }
    let summary = artifact.summary();
    if let Some(stats) = &summary.stats {
        info!(
            original = stats.original_size,
            compressed = stats.compressed_size,
            reduction = %stats.reduction_percentage(),
            "Compression stats"
        );
    }

    let delivered = deliver(artifact, grace, output).await;

    // The process may exit before a delayed release fires.
    ledger.release_all();

    let bytes = delivered?;
    info!(
        name = %summary.download_name,
        content_type = %summary.content_type,
        bytes,
        "Artifact written"
    );
    Ok(())
}

async fn deliver(artifact: JobArtifact, grace: Duration, output: Option<&Path>) -> Result<u64> {
    let stream = artifact.into_stream(grace).await?;
    match output {
        Some(path) => {
            let mut file = tokio::fs::File::create(path).await?;
            stream.deliver_to(&mut file).await
        }
        None => stream.deliver_to(&mut tokio::io::stdout()).await,
    }
}
