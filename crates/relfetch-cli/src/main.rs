//! relfetch - install a binary from a GitHub release

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use relfetch_cli::Cli;
use relfetch_cli::cmd;
use relfetch_cli::ui::ConsoleReporter;
use relfetch_core::{InstallError, InstallOutcome, Reporter};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging; stdout is reserved for the bin directory
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let reporter = Arc::new(ConsoleReporter::default());

    match run(&cli, reporter.clone()).await {
        Ok(outcome) if outcome.has_failures() => {
            reporter.error("Some files could not be made executable");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            reporter.error(&failure_message(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, reporter: Arc<ConsoleReporter>) -> Result<InstallOutcome> {
    let outcome = cmd::install::install(cli, reporter).await?;
    tracing::info!(
        tool = %outcome.tool,
        cache_hit = outcome.cache_hit,
        "install finished"
    );
    Ok(outcome)
}

/// Install errors are already user-facing; anything else is a bug or an
/// environment problem.
fn failure_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<InstallError>() {
        Some(install) => install.to_string(),
        None => format!("unexpected failure: {err:#}"),
    }
}
