// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF <-> DOCX conversion with headless LibreOffice.
//
// LibreOffice names its output after the input stem inside `--outdir`, and
// does not always use the exact name. After the run the output is resolved
// by name, then by scanning the directory, and finally renamed to the path
// the caller asked for.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::{DocumentFormat, PipelineConfig};
use tracing::{debug, info, instrument, warn};

use crate::tool::{self, ExternalCommand};

/// Conversions LibreOffice handles for us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeConversion {
    PdfToDocx,
    DocxToPdf,
}

impl OfficeConversion {
    pub fn from_formats(source: DocumentFormat, target: DocumentFormat) -> Option<Self> {
        match (source, target) {
            (DocumentFormat::Pdf, DocumentFormat::Docx) => Some(Self::PdfToDocx),
            (DocumentFormat::Docx, DocumentFormat::Pdf) => Some(Self::DocxToPdf),
            _ => None,
        }
    }

    pub fn target(&self) -> DocumentFormat {
        match self {
            Self::PdfToDocx => DocumentFormat::Docx,
            Self::DocxToPdf => DocumentFormat::Pdf,
        }
    }

    /// Value of `--convert-to`.
    fn filter(&self) -> &'static str {
        match self {
            Self::PdfToDocx => "docx:MS Word 2007 XML",
            Self::DocxToPdf => "pdf",
        }
    }

    /// PDFs must be opened with the Writer import filter to yield text.
    fn input_filter(&self) -> Option<&'static str> {
        match self {
            Self::PdfToDocx => Some("writer_pdf_import"),
            Self::DocxToPdf => None,
        }
    }
}

/// Runs LibreOffice conversions.
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    /// Executables probed in order.
    binaries: Vec<String>,
    to_pdf_timeout: Duration,
    to_office_timeout: Duration,
    kill_stale: bool,
}

impl OfficeConverter {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            binaries: config.office_binaries.clone(),
            to_pdf_timeout: config.office_to_pdf_timeout(),
            to_office_timeout: config.pdf_to_office_timeout(),
            kill_stale: config.kill_stale_office,
        }
    }

    pub fn timeout_for(&self, conversion: OfficeConversion) -> Duration {
        match conversion {
            OfficeConversion::PdfToDocx => self.to_office_timeout,
            OfficeConversion::DocxToPdf => self.to_pdf_timeout,
        }
    }

    /// LibreOffice argv (without the program name).
    ///
    /// `profile_dir` becomes a private user installation so concurrent jobs
    /// never contend for the same profile lock.
    pub fn office_args(
        conversion: OfficeConversion,
        input: &Path,
        out_dir: &Path,
        profile_dir: &Path,
    ) -> Vec<OsString> {
        let profile_url = format!(
            "file://{}",
            profile_dir.display().to_string().replace(' ', "%20")
        );
        let mut args: Vec<OsString> = vec![
            format!("-env:UserInstallation={profile_url}").into(),
            "--headless".into(),
            "--invisible".into(),
            "--nologo".into(),
            "--nofirststartwizard".into(),
        ];
        if let Some(filter) = conversion.input_filter() {
            args.push(format!("--infilter={filter}").into());
        }
        args.push("--convert-to".into());
        args.push(conversion.filter().into());
        args.push("--outdir".into());
        args.push(out_dir.into());
        args.push(input.into());
        args
    }

    /// Convert `input` and leave the result at `output`.
    ///
    /// If LibreOffice exits with an error but still produced a file, the file
    /// is used. A timeout is always fatal.
    #[instrument(skip_all, fields(conversion = ?conversion, input = %input.display()))]
    pub async fn convert(
        &self,
        conversion: OfficeConversion,
        input: &Path,
        output: &Path,
        profile_dir: &Path,
    ) -> Result<()> {
        let (binary, resolved) =
            tool::locate_any(&self.binaries).ok_or_else(|| PagewerkError::ExternalToolMissing {
                tool: "LibreOffice".into(),
                hint: "Please install it: sudo apt-get install libreoffice".into(),
            })?;
        debug!(binary, path = %resolved.display(), "Found LibreOffice");

        if self.kill_stale {
            kill_stale_office().await;
        }

        let input = std::path::absolute(input)?;
        let output = std::path::absolute(output)?;
        let out_dir = output
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| PagewerkError::Validation("output path has no directory".into()))?;
        let profile_dir = std::path::absolute(profile_dir)?;
        tokio::fs::create_dir_all(&profile_dir).await?;

        let run = ExternalCommand::new(&resolved, self.timeout_for(conversion))
            .args(Self::office_args(conversion, &input, &out_dir, &profile_dir))
            .run()
            .await;

        let tool_error = match run {
            Ok(_) => None,
            Err(err @ PagewerkError::ExternalToolTimeout { .. }) => return Err(err),
            Err(err) => {
                warn!(%err, "LibreOffice reported an error, looking for output anyway");
                Some(err)
            }
        };

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = conversion.target().extension();
        let found = match (discover_output(&out_dir, &stem, extension), tool_error) {
            (Ok(found), _) => found,
            (Err(_), Some(tool_error)) => return Err(tool_error),
            (Err(missing), None) => return Err(missing),
        };

        if found != output {
            debug!(from = %found.display(), to = %output.display(), "Renaming converted file");
            tokio::fs::rename(&found, &output).await?;
        }
        info!(output = %output.display(), "Conversion complete");
        Ok(())
    }
}

/// Locate LibreOffice's output for `stem` in `dir`.
///
/// Tries `<dir>/<stem>.<extension>` first, then the first file (by name)
/// ending in `.<extension>` whose name contains `stem`.
pub fn discover_output(dir: &Path, stem: &str, extension: &str) -> Result<PathBuf> {
    let expected = dir.join(format!("{stem}.{extension}"));
    if expected.is_file() {
        return Ok(expected);
    }

    let mut listing: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    listing.sort();

    let suffix = format!(".{extension}");
    if let Some(name) = listing
        .iter()
        .find(|name| name.ends_with(&suffix) && name.contains(stem))
    {
        info!(file = %name, "Found alternative output file");
        return Ok(dir.join(name));
    }

    Err(PagewerkError::ConversionOutputMissing { expected, listing })
}

/// Kill every `soffice.bin` on the machine, including those of concurrent jobs.
async fn kill_stale_office() {
    let result = ExternalCommand::new("pkill", Duration::from_secs(5))
        .args(["-f", "soffice.bin"])
        .run()
        .await;
    // pkill exits 1 when nothing matched.
    debug!(killed = result.is_ok(), "Stale LibreOffice check");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn converter(binaries: Vec<String>) -> OfficeConverter {
        OfficeConverter {
            binaries,
            ..OfficeConverter::from_config(&PipelineConfig::default())
        }
    }

    #[test]
    fn pdf_to_docx_argv() {
        let args = strings(OfficeConverter::office_args(
            OfficeConversion::PdfToDocx,
            Path::new("/jobs/1/in.pdf"),
            Path::new("/jobs/1"),
            Path::new("/jobs/1/lo profile"),
        ));
        assert_eq!(
            args,
            vec![
                "-env:UserInstallation=file:///jobs/1/lo%20profile",
                "--headless",
                "--invisible",
                "--nologo",
                "--nofirststartwizard",
                "--infilter=writer_pdf_import",
                "--convert-to",
                "docx:MS Word 2007 XML",
                "--outdir",
                "/jobs/1",
                "/jobs/1/in.pdf",
            ]
        );
    }

    #[test]
    fn docx_to_pdf_has_no_input_filter() {
        let args = strings(OfficeConverter::office_args(
            OfficeConversion::DocxToPdf,
            Path::new("a.docx"),
            Path::new("out"),
            Path::new("/p"),
        ));
        assert!(!args.iter().any(|a| a.starts_with("--infilter")));
        assert_eq!(args[6], "pdf");
    }

    #[test]
    fn conversion_pairs_and_timeouts() {
        assert_eq!(
            OfficeConversion::from_formats(DocumentFormat::Pdf, DocumentFormat::Docx),
            Some(OfficeConversion::PdfToDocx)
        );
        assert_eq!(
            OfficeConversion::from_formats(DocumentFormat::Pdf, DocumentFormat::Pdf),
            None
        );
        let c = converter(vec!["soffice".into()]);
        assert_eq!(c.timeout_for(OfficeConversion::PdfToDocx), Duration::from_secs(90));
        assert_eq!(c.timeout_for(OfficeConversion::DocxToPdf), Duration::from_secs(60));
    }

    #[test]
    fn discovery_prefers_exact_name_then_scans() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report (1).docx"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.docx"), b"x").unwrap();

        let found = discover_output(dir.path(), "report", "docx").unwrap();
        assert_eq!(found, dir.path().join("report (1).docx"));

        std::fs::write(dir.path().join("report.docx"), b"x").unwrap();
        let found = discover_output(dir.path(), "report", "docx").unwrap();
        assert_eq!(found, dir.path().join("report.docx"));
    }

    #[test]
    fn discovery_failure_lists_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("input.pdf"), b"x").unwrap();

        match discover_output(dir.path(), "input", "docx").unwrap_err() {
            PagewerkError::ConversionOutputMissing { expected, listing } => {
                assert_eq!(expected, dir.path().join("input.docx"));
                assert_eq!(listing, vec!["input.pdf"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_office_suite() {
        let dir = tempfile::tempdir().unwrap();
        let err = converter(vec!["pagewerk-no-soffice".into(), "pagewerk-no-lo".into()])
            .convert(
                OfficeConversion::DocxToPdf,
                &dir.path().join("a.docx"),
                &dir.path().join("a.pdf"),
                &dir.path().join("profile"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PagewerkError::ExternalToolMissing { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn renames_discovered_output() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake-soffice");
        std::fs::write(
            &fake,
            "#!/bin/sh\n\
             for last; do :; done\n\
             while [ $# -gt 0 ]; do [ \"$1\" = --outdir ] && out=\"$2\"; shift; done\n\
             name=$(basename \"$last\")\n\
             printf converted > \"$out/${name%.*} (1).docx\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let input = dir.path().join("letter.pdf");
        std::fs::write(&input, b"%PDF").unwrap();
        let output = dir.path().join("converted.docx");

        converter(vec![fake.display().to_string()])
            .convert(
                OfficeConversion::PdfToDocx,
                &input,
                &output,
                &dir.path().join("profile"),
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), "converted");
        assert!(!dir.path().join("letter (1).docx").exists());
    }
}
