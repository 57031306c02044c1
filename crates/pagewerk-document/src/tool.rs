// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External tool runner.
//
// Tools are started with an explicit argv (never through a shell), with
// stdin closed, and bounded by a timeout. A child that outlives its timeout is
// killed when its handle is dropped.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use pagewerk_core::error::{PagewerkError, Result};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Captured output of a successful run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// One invocation of an external program.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: OsString,
    /// Name used in errors and logs.
    tool: String,
    args: Vec<OsString>,
    timeout: Duration,
}

impl ExternalCommand {
    pub fn new(program: impl AsRef<OsStr>, timeout: Duration) -> Self {
        let program = program.as_ref().to_os_string();
        let tool = Path::new(&program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.to_string_lossy().into_owned());
        Self {
            program,
            tool,
            args: Vec::new(),
            timeout,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Run to completion.
    ///
    /// A missing executable maps to [`PagewerkError::ExternalToolMissing`],
    /// an expired timeout to [`PagewerkError::ExternalToolTimeout`], and a
    /// non-zero exit to [`PagewerkError::ExternalToolFailed`] carrying stderr.
    #[instrument(skip_all, fields(tool = %self.tool, timeout = ?self.timeout))]
    pub async fn run(&self) -> Result<ToolOutput> {
        debug!(args = ?self.args, "Starting external tool");

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    PagewerkError::ExternalToolMissing {
                        tool: self.tool.clone(),
                        hint: format!(
                            "`{}` was not found on PATH.",
                            self.program.to_string_lossy()
                        ),
                    }
                } else {
                    PagewerkError::ExternalToolFailed {
                        tool: self.tool.clone(),
                        detail: format!("failed to start: {err}"),
                    }
                }
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|err| PagewerkError::ExternalToolFailed {
                tool: self.tool.clone(),
                detail: format!("failed to collect output: {err}"),
            })?,
            Err(_) => {
                warn!("External tool timed out");
                return Err(PagewerkError::ExternalToolTimeout {
                    tool: self.tool.clone(),
                    timeout: self.timeout,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(PagewerkError::ExternalToolFailed {
                tool: self.tool.clone(),
                detail: format!("exit code {}: {}", code, stderr.trim()),
            });
        }

        debug!(stdout_len = stdout.len(), "External tool finished");
        Ok(ToolOutput { stdout, stderr })
    }
}

/// Resolve `binary` to an executable file, searching `PATH` for bare names.
pub fn locate(binary: &str) -> Option<PathBuf> {
    let candidate = Path::new(binary);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(binary))
        .find(|full| full.is_file())
}

/// First of `candidates` that [`locate`] finds, with its resolved path.
pub fn locate_any<'a>(candidates: &'a [String]) -> Option<(&'a str, PathBuf)> {
    candidates
        .iter()
        .find_map(|name| locate(name).map(|path| (name.as_str(), path)))
}
