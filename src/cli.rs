//! CLI argument parsing for depbot

use crate::output::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// Dependency update pull-request decision engine
#[derive(Parser, Debug, Clone)]
#[command(name = "depbot", version, about = "Dependency update pull-request decision engine")]
pub struct CliArgs {
    /// Path to the job definition JSON file
    pub job_file: PathBuf,

    /// Local repository checkout to read dependency files from
    #[arg(long, default_value = ".")]
    pub repo_path: PathBuf,

    /// Base commit SHA the job ran against
    #[arg(long, default_value = "unknown")]
    pub base_commit_sha: String,

    /// Backend service URL; omit to run against the recording service
    #[arg(long)]
    pub api_url: Option<String>,

    /// Job id used in service endpoints
    #[arg(long, default_value = "local")]
    pub job_id: String,

    /// Job token sent as the Authorization header
    #[arg(long)]
    pub job_token: Option<String>,

    /// Decide everything but send no PR actions to the backend
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Output the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// The summary format implied by the flags.
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }

    /// True when a real backend should receive the run's actions.
    pub fn uses_backend(&self) -> bool {
        self.api_url.is_some() && !self.dry_run
    }

    /// The log level implied by the flags.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            log::LevelFilter::Warn
        } else if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}
