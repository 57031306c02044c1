// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.
//
// The config is built once at the edge (binary or server) and handed to each
// job by value. Nothing inside the pipeline reads the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings shared by every job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root under which each job gets its own working directory.
    pub temp_root: PathBuf,
    /// Ghostscript executable used for compression and rasterization.
    pub ghostscript_binary: String,
    /// LibreOffice executables, probed in order.
    pub office_binaries: Vec<String>,
    /// Timeout for a Ghostscript compression run.
    pub compress_timeout_secs: u64,
    /// Timeout for rendering a single page.
    pub rasterize_timeout_secs: u64,
    /// Timeout for DOCX → PDF.
    pub office_to_pdf_timeout_secs: u64,
    /// Timeout for PDF → DOCX.
    pub pdf_to_office_timeout_secs: u64,
    /// Delay between the end of a streamed response and cleanup.
    pub stream_grace_millis: u64,
    /// Kill leftover `soffice.bin` processes before converting.
    ///
    /// The kill is machine-wide: it also ends conversions of other jobs
    /// running at the same time. Only enable it where jobs run one at a time.
    pub kill_stale_office: bool,
    /// Canvas used when embedding images into a new PDF.
    pub page_size: crate::PaperSize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temp_root: PathBuf::from("./temp"),
            ghostscript_binary: "gs".into(),
            office_binaries: vec!["soffice".into(), "libreoffice".into()],
            compress_timeout_secs: 120,
            rasterize_timeout_secs: 60,
            office_to_pdf_timeout_secs: 60,
            pdf_to_office_timeout_secs: 90,
            stream_grace_millis: 1000,
            kill_stale_office: false,
            page_size: crate::PaperSize::A4,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Overlay `TEMP_DIR` and `PAGEWERK_*` environment variables on `self`.
    ///
    /// Unparseable numeric values are ignored.
    pub fn with_env(mut self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok());
        self
    }

    /// Defaults overlaid with the environment.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("TEMP_DIR") {
            self.temp_root = PathBuf::from(dir);
        }
        if let Some(gs) = lookup("PAGEWERK_GHOSTSCRIPT") {
            self.ghostscript_binary = gs;
        }
        if let Some(office) = lookup("PAGEWERK_OFFICE_BINARIES") {
            let bins: Vec<String> = office
                .split(',')
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty())
                .collect();
            if !bins.is_empty() {
                self.office_binaries = bins;
            }
        }
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(v) = number("PAGEWERK_COMPRESS_TIMEOUT_SECS") {
            self.compress_timeout_secs = v;
        }
        if let Some(v) = number("PAGEWERK_RASTERIZE_TIMEOUT_SECS") {
            self.rasterize_timeout_secs = v;
        }
        if let Some(v) = number("PAGEWERK_OFFICE_TIMEOUT_SECS") {
            self.office_to_pdf_timeout_secs = v;
            self.pdf_to_office_timeout_secs = v;
        }
        if let Some(v) = number("PAGEWERK_STREAM_GRACE_MILLIS") {
            self.stream_grace_millis = v;
        }
        if let Some(v) = lookup("PAGEWERK_KILL_STALE_OFFICE") {
            self.kill_stale_office = matches!(v.trim(), "1" | "true" | "yes");
        }
    }

    pub fn compress_timeout(&self) -> Duration {
        Duration::from_secs(self.compress_timeout_secs)
    }

    pub fn rasterize_timeout(&self) -> Duration {
        Duration::from_secs(self.rasterize_timeout_secs)
    }

    pub fn office_to_pdf_timeout(&self) -> Duration {
        Duration::from_secs(self.office_to_pdf_timeout_secs)
    }

    pub fn pdf_to_office_timeout(&self) -> Duration {
        Duration::from_secs(self.pdf_to_office_timeout_secs)
    }

    pub fn stream_grace(&self) -> Duration {
        Duration::from_millis(self.stream_grace_millis)
    }
}
