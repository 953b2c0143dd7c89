//! depbot - dependency update pull-request decision engine CLI
//!
//! Reads a job definition JSON file, loads dependency files from a
//! local checkout, runs the decision loop and prints a run summary.
//! Without an `--api-url` the recording service is used and no PR
//! actions leave the machine.

use clap::Parser;
use depbot::cli::CliArgs;
use depbot::ecosystem::{CargoEcosystem, EcosystemRegistry, NpmEcosystem};
use depbot::error::UpdaterError;
use depbot::fetcher::fetch_dependency_files;
use depbot::job::{Job, JobDefinition};
use depbot::output::create_formatter;
use depbot::progress::Progress;
use depbot::registry::{CratesIoSource, HttpClient, NpmSource};
use depbot::service::{ApiClient, DryRunService, Service};
use depbot::snapshot::DependencySnapshot;
use depbot::telemetry::EcosystemTelemetry;
use depbot::updater::{ErrorHandler, RunOutcome, Updater};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Err(e) = TermLogger::init(
        args.log_level(),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logger: {e}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let definition_text = std::fs::read_to_string(&args.job_file)?;
    let definition = JobDefinition::from_json(&definition_text)?;
    let job = Job::from_definition(definition);

    let registry = build_ecosystem_registry()?;
    let telemetry = EcosystemTelemetry::new();
    telemetry.record_version("depbot", env!("CARGO_PKG_VERSION"));

    let service: Box<dyn Service> = if args.uses_backend() {
        let api_url = args.api_url.clone().unwrap_or_default();
        Box::new(ApiClient::new(
            api_url,
            args.job_id.as_str(),
            args.job_token.clone(),
        )?)
    } else {
        Box::new(DryRunService::new())
    };

    let outcome = run_job(&args, &job, &registry, service.as_ref(), &telemetry).await;

    let formatter = create_formatter(args.output_format());
    let mut stdout = io::stdout().lock();
    formatter.format(&outcome, &mut stdout)?;
    stdout.flush()?;

    if outcome.error_count() > 0 {
        // Partial success
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Runs the job against the snapshot, falling back to error reporting
/// when the dependency files cannot even be parsed. Either way the job
/// ends marked as processed.
async fn run_job(
    args: &CliArgs,
    job: &Job,
    registry: &EcosystemRegistry,
    service: &dyn Service,
    telemetry: &EcosystemTelemetry,
) -> RunOutcome {
    let snapshot = match build_snapshot(args, job, registry) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            // Parse-time failures are fatal for the run but the job
            // must not be left in an ambiguous state
            let handler = ErrorHandler::new(service, job.flags());
            handler.handle_parse_error(error).await;
            if let Err(e) = service.mark_job_as_processed(&args.base_commit_sha).await {
                log::warn!("Service call failed: {e}");
            }
            return RunOutcome {
                outcomes: Vec::new(),
                error_counts: handler.error_counts(),
            };
        }
    };

    telemetry.increment("update_job_runs");

    let mut progress = Progress::new(!args.quiet && !args.json);
    progress.spinner("Processing update job");
    let outcome = Updater::new(job, snapshot, service, registry).run().await;
    progress.finish_and_clear();
    outcome
}

fn build_snapshot(
    args: &CliArgs,
    job: &Job,
    registry: &EcosystemRegistry,
) -> Result<DependencySnapshot, UpdaterError> {
    let ecosystem = registry.get(job.package_manager())?;
    let files = fetch_dependency_files(job, ecosystem.as_ref(), &args.repo_path)?;
    DependencySnapshot::create(job, files, args.base_commit_sha.clone(), registry)
}

/// Registers the built-in ecosystems against the public registries.
fn build_ecosystem_registry() -> anyhow::Result<EcosystemRegistry> {
    let client = HttpClient::new().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let mut registry = EcosystemRegistry::new();
    registry.register(Arc::new(CargoEcosystem::new(Arc::new(CratesIoSource::new(
        client.clone(),
    )))));
    registry.register(Arc::new(NpmEcosystem::new(Arc::new(NpmSource::new(client)))));
    Ok(registry)
}
