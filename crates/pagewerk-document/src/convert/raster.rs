// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterization with Ghostscript, one process per page.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::{ImageFormat, PipelineConfig};
use tracing::{info, instrument};

use crate::outcome::{Attempts, UnitOutcome};
use crate::pdf;
use crate::tool::{self, ExternalCommand};

/// Quality used when a request does not give one.
pub const DEFAULT_QUALITY: u8 = 90;

/// Renders PDF pages to PNG or JPEG files.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    ghostscript: String,
    /// Per page.
    timeout: Duration,
}

impl Rasterizer {
    pub fn new(ghostscript: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ghostscript: ghostscript.into(),
            timeout,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.ghostscript_binary.clone(), config.rasterize_timeout())
    }

    /// Rendering resolution for a quality setting: three DPI per quality point.
    pub fn resolution(quality: u8) -> u32 {
        u32::from(quality) * 3
    }

    pub fn validate_quality(quality: u8) -> Result<()> {
        if (1..=100).contains(&quality) {
            Ok(())
        } else {
            Err(PagewerkError::Validation(format!(
                "quality must be between 1 and 100, got {quality}"
            )))
        }
    }

    /// Ghostscript argv (without the program name) rendering one page.
    pub fn page_args(
        input: &Path,
        output: &Path,
        page: u32,
        format: ImageFormat,
        quality: u8,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-dSAFER".into(),
            "-dBATCH".into(),
            "-dNOPAUSE".into(),
            "-dQUIET".into(),
            format!("-sDEVICE={}", format.gs_device()).into(),
            format!("-r{}", Self::resolution(quality)).into(),
            format!("-dFirstPage={page}").into(),
            format!("-dLastPage={page}").into(),
        ];
        if format.is_jpeg() {
            args.push(format!("-dJPEGQ={quality}").into());
        }
        let mut output_arg = OsString::from("-sOutputFile=");
        output_arg.push(output);
        args.push(output_arg);
        args.push(input.into());
        args
    }

    /// Render every page of `input` into `out_dir` as `page_<n>.<ext>`.
    ///
    /// A page that fails to render is skipped. A missing Ghostscript is fatal
    /// up front, and a page that hits the timeout ends the run.
    #[instrument(skip_all, fields(input = %input.display(), format = ?format, quality = quality))]
    pub async fn rasterize(
        &self,
        input: &Path,
        out_dir: &Path,
        format: ImageFormat,
        quality: u8,
    ) -> Result<Attempts<PathBuf>> {
        Self::validate_quality(quality)?;
        if tool::locate(&self.ghostscript).is_none() {
            return Err(PagewerkError::ExternalToolMissing {
                tool: "Ghostscript".into(),
                hint: "Please install it: sudo apt-get install ghostscript".into(),
            });
        }

        let source = input.to_path_buf();
        let page_count = tokio::task::spawn_blocking(move || pdf::page_count(&source))
            .await
            .map_err(|err| PagewerkError::Worker(format!("page count task failed: {err}")))??;
        tokio::fs::create_dir_all(out_dir).await?;
        info!(page_count, dpi = Self::resolution(quality), "Rasterizing PDF");

        let mut attempts = Attempts::new();
        for page in 1..=page_count {
            let output = out_dir.join(format!("page_{page}.{}", format.extension()));
            match self.render_page(input, &output, page, format, quality).await {
                Err(err @ PagewerkError::ExternalToolTimeout { .. }) => return Err(err),
                rendered => {
                    attempts.record(UnitOutcome::from_result(format!("page {page}"), rendered))
                }
            }
        }

        let attempts = attempts.require_any("No images were created")?;
        info!(
            created = attempts.successes.len(),
            page_count, "Rasterization complete"
        );
        Ok(attempts)
    }

    async fn render_page(
        &self,
        input: &Path,
        output: &Path,
        page: u32,
        format: ImageFormat,
        quality: u8,
    ) -> Result<PathBuf> {
        ExternalCommand::new(&self.ghostscript, self.timeout)
            .args(Self::page_args(input, output, page, format, quality))
            .run()
            .await?;

        if tokio::fs::try_exists(output).await.unwrap_or(false) {
            Ok(output.to_path_buf())
        } else {
            Err(PagewerkError::ExternalToolFailed {
                tool: self.ghostscript.clone(),
                detail: format!("no image written for page {page}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn png_page_argv() {
        let args = Rasterizer::page_args(
            Path::new("doc.pdf"),
            Path::new("out/page_2.png"),
            2,
            ImageFormat::Png,
            90,
        );
        assert_eq!(
            strings(args),
            vec![
                "-dSAFER",
                "-dBATCH",
                "-dNOPAUSE",
                "-dQUIET",
                "-sDEVICE=png16m",
                "-r270",
                "-dFirstPage=2",
                "-dLastPage=2",
                "-sOutputFile=out/page_2.png",
                "doc.pdf",
            ]
        );
    }

    #[test]
    fn jpeg_adds_quality_flag() {
        let args = strings(Rasterizer::page_args(
            Path::new("doc.pdf"),
            Path::new("page_1.jpg"),
            1,
            ImageFormat::Jpg,
            40,
        ));
        assert!(args.contains(&"-sDEVICE=jpeg".to_string()));
        assert!(args.contains(&"-r120".to_string()));
        assert!(args.contains(&"-dJPEGQ=40".to_string()));
    }

    #[test]
    fn quality_bounds() {
        assert!(Rasterizer::validate_quality(0).is_err());
        assert!(Rasterizer::validate_quality(101).is_err());
        assert!(Rasterizer::validate_quality(1).is_ok());
        assert!(Rasterizer::validate_quality(DEFAULT_QUALITY).is_ok());
    }

    #[tokio::test]
    async fn missing_ghostscript_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = Rasterizer::new("pagewerk-no-such-gs", Duration::from_secs(1))
            .rasterize(&dir.path().join("in.pdf"), dir.path(), ImageFormat::Png, 90)
            .await
            .unwrap_err();
        assert!(matches!(err, PagewerkError::ExternalToolMissing { .. }));
    }

    /// Fake Ghostscript: runs `page_1` for the first page, then writes the
    /// requested output file unless told to fail.
    #[cfg(unix)]
    fn fake_ghostscript(dir: &Path, page_1: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let fake = dir.join("fake-gs");
        let script = format!(
            "#!/bin/sh\n\
             for arg; do\n\
               case \"$arg\" in\n\
                 -dFirstPage=1) {page_1} ;;\n\
                 -sOutputFile=*) out=\"${{arg#-sOutputFile=}}\" ;;\n\
               esac\n\
             done\n\
             printf image > \"$out\"\n"
        );
        std::fs::write(&fake, script).unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();
        fake
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_page_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("two.pdf");
        crate::fixtures::write_sample_pdf(&input, 2).unwrap();
        let gs = fake_ghostscript(dir.path(), "exit 1");

        let attempts = Rasterizer::new(gs.display().to_string(), Duration::from_secs(5))
            .rasterize(&input, &dir.path().join("images"), ImageFormat::Png, 90)
            .await
            .unwrap();

        assert_eq!(attempts.successes, vec![dir.path().join("images/page_2.png")]);
        assert_eq!(attempts.skips.len(), 1);
        assert_eq!(attempts.skips[0].unit, "page 1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn page_timeout_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("two.pdf");
        crate::fixtures::write_sample_pdf(&input, 2).unwrap();
        let gs = fake_ghostscript(dir.path(), "sleep 5");

        let err = Rasterizer::new(gs.display().to_string(), Duration::from_millis(300))
            .rasterize(&input, &dir.path().join("images"), ImageFormat::Png, 90)
            .await
            .unwrap_err();

        assert!(matches!(err, PagewerkError::ExternalToolTimeout { .. }));
        assert!(!dir.path().join("images/page_2.png").exists());
    }
}
