// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagewerk — document job pipeline
//
// Entry point. Initialises logging, loads the pipeline config, and runs one
// job per invocation. Artifacts go to `-o FILE` or stdout, so logs go to
// stderr.

mod command;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use pagewerk_core::{ErrorClass, PipelineConfig, Result, error_response};

use command::Command;

#[derive(Parser)]
#[command(name = "pagewerk")]
#[command(version)]
#[command(about = "Merge, split, compress, rasterize, and convert documents", long_about = None)]
struct Cli {
    /// JSON config file; PAGEWERK_* and TEMP_DIR variables still apply on top
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let operation = cli.command.name();

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => command::execute(cli.command, config).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let body = error_response(&err, operation);
            match serde_json::to_string_pretty(&body) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{err}"),
            }
            match err.class() {
                ErrorClass::Client => ExitCode::from(2),
                ErrorClass::Server => ExitCode::FAILURE,
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => Ok(PipelineConfig::load(path)?.with_env()),
        None => Ok(PipelineConfig::from_env()),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["pagewerk", "info", "a.pdf", "--config", "pw.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("pw.json")));
        assert_eq!(cli.command.name(), "inspect");
    }

    #[test]
    fn split_requires_exactly_one_strategy() {
        assert!(Cli::try_parse_from(["pagewerk", "split", "a.pdf"]).is_err());
        assert!(
            Cli::try_parse_from(["pagewerk", "split", "a.pdf", "--individual", "--every", "2"]).is_err()
        );
        assert!(Cli::try_parse_from(["pagewerk", "split", "a.pdf", "--every", "2"]).is_ok());
    }

    #[test]
    fn merge_needs_two_files() {
        assert!(Cli::try_parse_from(["pagewerk", "merge", "a.pdf"]).is_err());
        assert!(Cli::try_parse_from(["pagewerk", "merge", "a.pdf", "b.pdf", "-o", "out.pdf"]).is_ok());
    }
}
