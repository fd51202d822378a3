//! Install command: turn CLI inputs into a request, run the pipeline and
//! expose the result.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use relfetch_core::config::validate_binaries_location;
use relfetch_core::{
    Config, Context, FileMode, InstallError, InstallOutcome, InstallRequest, Reporter,
};
use relfetch_schema::RepoSlug;

use crate::{Cli, non_empty};

/// Build the pipeline request from parsed arguments.
pub fn build_request(cli: &Cli) -> Result<InstallRequest, InstallError> {
    let repo: RepoSlug = cli.repo.parse()?;

    let mode = match non_empty(Some(cli.chmod.as_str())) {
        Some(raw) => FileMode::parse(raw)?,
        None => FileMode::default(),
    };
    let binaries_location = non_empty(cli.binaries_location.as_deref())
        .map(validate_binaries_location)
        .transpose()?;

    Ok(InstallRequest {
        tag: non_empty(Some(cli.tag.as_str())).unwrap_or_default().to_string(),
        platform: non_empty(cli.platform.as_deref()).map(str::to_string),
        arch: non_empty(cli.arch.as_deref()).map(str::to_string),
        cache: cli.cache_enabled(),
        mode,
        binaries_location,
        ..InstallRequest::new(repo)
    })
}

/// Run one install and expose the bin directory.
///
/// Chmod failures do not make this return an error; callers check
/// [`InstallOutcome::has_failures`] to set the exit status.
pub async fn install(
    cli: &Cli,
    reporter: Arc<dyn Reporter>,
) -> Result<InstallOutcome, InstallError> {
    let request = build_request(cli)?;
    let config = Config::from_env()?.with_token(non_empty(cli.token.as_deref()).map(str::to_string));
    tracing::debug!(?config, ?request, "starting install");

    let ctx = Context::new(config, reporter)?;
    let outcome = relfetch_core::install(&ctx, &request).await?;

    let github_path = std::env::var_os("GITHUB_PATH").filter(|v| !v.is_empty());
    if let Some(file) = github_path {
        append_path_entry(Path::new(&file), &outcome.bin_dir)
            .map_err(|e| InstallError::context("Failed to update GITHUB_PATH", e))?;
    }
    println!("{}", outcome.bin_dir.display());

    Ok(outcome)
}

/// Append `dir` as one line to a path file.
pub fn append_path_entry(path_file: &Path, dir: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path_file)?;
    writeln!(file, "{}", dir.display())
}
