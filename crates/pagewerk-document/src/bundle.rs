// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Zip bundling for multi-file results.
//
// The archive is built in a temporary file next to `output` and moved into
// place only after the central directory is written, so `output` is either
// a complete archive or absent.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use pagewerk_core::error::{PagewerkError, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::outcome::file_label;

/// Zip `files` into `output`, entries named by base name.
///
/// Returns the size of the finished archive.
#[instrument(skip_all, fields(files = files.len(), output = %output.display()))]
pub fn bundle(files: &[PathBuf], output: &Path) -> Result<u64> {
    if files.is_empty() {
        return Err(PagewerkError::Archive("nothing to bundle".into()));
    }

    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let staging = NamedTempFile::new_in(dir)?;
    let mut zip = ZipWriter::new(staging);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    for (index, (path, name)) in files.iter().zip(entry_names(files)).enumerate() {
        zip.start_file(name.as_str(), options).map_err(|e| {
            PagewerkError::Archive(format!("failed to create ZIP entry {name}: {e}"))
        })?;
        let mut source = File::open(path)?;
        std::io::copy(&mut source, &mut zip)?;
        debug!(index, entry = %name, "Added archive entry");
    }

    let staging = zip
        .finish()
        .map_err(|e| PagewerkError::Archive(format!("failed to finalize ZIP: {e}")))?;
    let file = staging.persist(output).map_err(|e| {
        PagewerkError::Archive(format!("failed to move archive into place: {}", e.error))
    })?;
    let size = file.metadata()?.len();

    info!(size, "Archive written");
    Ok(size)
}

/// Base names, with a numeric prefix on any name already taken. The prefix
/// starts at the file's 1-based position and counts up until the name is free.
fn entry_names(files: &[PathBuf]) -> Vec<String> {
    let mut seen = HashSet::new();
    files
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let base = file_label(path);
            let mut name = base.clone();
            let mut prefix = index + 1;
            while !seen.insert(name.clone()) {
                name = format!("{prefix}_{base}");
                prefix += 1;
            }
            name
        })
        .collect()
}
