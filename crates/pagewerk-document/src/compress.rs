// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compression engine.
//
// Ghostscript's pdfwrite device does the real work. When Ghostscript is
// missing, fails, times out, or leaves no output, the document is rewritten
// in-process with lopdf instead: unreferenced objects pruned, empty streams
// dropped, every stream deflated.

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use lopdf::{Dictionary, Document, Object};
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::{CompressionOptions, CompressionProfile, PipelineConfig};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::tool::ExternalCommand;

/// Information fields cleared when stripping metadata.
const INFO_FIELDS: [&[u8]; 6] = [
    b"Title",
    b"Author",
    b"Subject",
    b"Keywords",
    b"Producer",
    b"Creator",
];

/// Before/after sizes of a compression run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressionStats {
    pub original_size: u64,
    pub compressed_size: u64,
    /// Bytes saved; negative when the output grew.
    pub reduction: i64,
    /// Percentage saved, rounded to two decimals. Zero for an empty original.
    pub reduction_percent: f64,
}

impl CompressionStats {
    pub fn from_sizes(original_size: u64, compressed_size: u64) -> Self {
        let reduction = original_size as i64 - compressed_size as i64;
        let reduction_percent = if original_size == 0 {
            0.0
        } else {
            let raw = reduction as f64 / original_size as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        };
        Self {
            original_size,
            compressed_size,
            reduction,
            reduction_percent,
        }
    }

    /// The percentage as displayed to users, e.g. `"60.00"`.
    pub fn reduction_percentage(&self) -> String {
        format!("{:.2}", self.reduction_percent)
    }
}

/// Compresses PDFs, Ghostscript first.
#[derive(Debug, Clone)]
pub struct CompressionEngine {
    ghostscript: String,
    timeout: Duration,
}

impl CompressionEngine {
    pub fn new(ghostscript: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ghostscript: ghostscript.into(),
            timeout,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.ghostscript_binary.clone(), config.compress_timeout())
    }

    /// Ghostscript argv (without the program name) for one compression run.
    pub fn ghostscript_args(
        input: &Path,
        output: &Path,
        profile: CompressionProfile,
        options: CompressionOptions,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-sDEVICE=pdfwrite".into(),
            "-dCompatibilityLevel=1.4".into(),
            format!("-dPDFSETTINGS={}", profile.gs_preset()).into(),
            "-dNOPAUSE".into(),
            "-dQUIET".into(),
            "-dBATCH".into(),
        ];
        if options.strip_images {
            let dpi = profile.dpi();
            args.push("-dCompressFonts=true".into());
            args.push(format!("-dColorImageResolution={dpi}").into());
            args.push(format!("-dGrayImageResolution={dpi}").into());
            args.push(format!("-dMonoImageResolution={dpi}").into());
        }
        if options.strip_metadata {
            args.push("-dPrinted=false".into());
        }
        let mut output_arg = OsString::from("-sOutputFile=");
        output_arg.push(output);
        args.push(output_arg);
        args.push(input.into());
        args
    }

    /// Compress `input` into `output`.
    ///
    /// Fails with [`PagewerkError::CompressionFailed`] only if both
    /// Ghostscript and the in-process rewrite fail.
    #[instrument(skip_all, fields(input = %input.display(), profile = ?profile))]
    pub async fn compress(
        &self,
        input: &Path,
        output: &Path,
        profile: CompressionProfile,
        options: CompressionOptions,
    ) -> Result<CompressionStats> {
        let original_size = tokio::fs::metadata(input).await?.len();
        info!(original_size, "Starting compression");

        if let Err(primary) = self.run_ghostscript(input, output, profile, options).await {
            warn!(%primary, "Ghostscript compression failed, using in-process fallback");

            let (src, dst) = (input.to_path_buf(), output.to_path_buf());
            let fallback = tokio::task::spawn_blocking(move || rewrite_in_process(&src, &dst, options))
                .await
                .map_err(|err| PagewerkError::Worker(format!("compression task failed: {err}")))
                .and_then(|result| result);

            if let Err(fallback) = fallback {
                return Err(PagewerkError::CompressionFailed {
                    primary: primary.to_string(),
                    fallback: fallback.to_string(),
                });
            }
        }

        let compressed_size = tokio::fs::metadata(output).await?.len();
        let stats = CompressionStats::from_sizes(original_size, compressed_size);
        info!(
            compressed_size,
            reduction = %stats.reduction_percentage(),
            "Compression complete"
        );
        Ok(stats)
    }

    async fn run_ghostscript(
        &self,
        input: &Path,
        output: &Path,
        profile: CompressionProfile,
        options: CompressionOptions,
    ) -> Result<()> {
        ExternalCommand::new(&self.ghostscript, self.timeout)
            .args(Self::ghostscript_args(input, output, profile, options))
            .run()
            .await?;

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(PagewerkError::ExternalToolFailed {
                tool: self.ghostscript.clone(),
                detail: format!("no output written to {}", output.display()),
            }),
        }
    }
}

/// Rewrite `input` to `output` with lopdf's own compaction.
fn rewrite_in_process(input: &Path, output: &Path, options: CompressionOptions) -> Result<()> {
    let mut document = Document::load(input).map_err(|err| {
        PagewerkError::PdfError(format!("failed to open {}: {}", input.display(), err))
    })?;

    if options.strip_metadata
        && let Some(info) = info_dictionary_mut(&mut document)
    {
        for key in INFO_FIELDS {
            info.remove(key);
        }
    }

    let pruned = document.prune_objects();
    let emptied = document.delete_zero_length_streams();
    document.compress();
    document.save(output).map_err(|err| {
        PagewerkError::PdfError(format!("failed to write {}: {}", output.display(), err))
    })?;

    info!(
        pruned = pruned.len(),
        empty_streams = emptied.len(),
        "In-process compression complete"
    );
    Ok(())
}

fn info_dictionary_mut(document: &mut Document) -> Option<&mut Dictionary> {
    let info_id = match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => Some(*id),
        Object::Dictionary(_) => None,
        _ => return None,
    };
    match info_id {
        Some(id) => document.get_dictionary_mut(id).ok(),
        None => document.trailer.get_mut(b"Info").ok()?.as_dict_mut().ok(),
    }
}
