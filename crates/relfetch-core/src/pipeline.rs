//! Install pipeline.
//!
//! ```text
//! resolve --> derive key --> check cache --hit--> done
//!                                 |
//!                                miss
//!                                 v
//!   fetch release --> match asset --> download --> extract --> finalize --> store cache --> done
//! ```
//!
//! The cache only participates when it is enabled for the request and the
//! tag is fixed. A hit skips everything after the check: nothing is
//! fetched, downloaded or extracted again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use relfetch_schema::{
    ArchAliases, ArchiveKind, AssetQuery, LATEST_TAG, Platform, Release, ReleaseAsset, RepoSlug,
    ToolInfo,
};
use tracing::{debug, info};

use crate::config::Config;
use crate::context::{Context, Host};
use crate::error::InstallError;
use crate::finalize::{self, ChmodReport, FileMode};
use crate::io::cache::SaveOutcome;
use crate::io::extract::Extractor;

/// Inputs of one install run.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub repo: RepoSlug,
    /// Release tag; `latest` (or empty) follows the newest release.
    pub tag: String,
    pub platform: Option<String>,
    pub arch: Option<String>,
    pub cache: bool,
    pub mode: FileMode,
    /// Directory inside the install destination holding the binaries.
    pub binaries_location: Option<PathBuf>,
}

impl InstallRequest {
    pub fn new(repo: RepoSlug) -> Self {
        Self {
            repo,
            tag: LATEST_TAG.to_string(),
            platform: None,
            arch: None,
            cache: false,
            mode: FileMode::default(),
            binaries_location: None,
        }
    }

    /// Resolve platform, architecture, key and paths for this request.
    pub fn resolve(&self, host: &Host, config: &Config) -> Result<ResolvedTool, InstallError> {
        let platform = Platform::resolve(self.platform.as_deref(), &host.os)?;
        let arch = ArchAliases::resolve(self.arch.as_deref(), &host.arch)?;

        let tag = if self.tag.trim().is_empty() {
            LATEST_TAG
        } else {
            self.tag.trim()
        };
        let tool = ToolInfo::new(&self.repo, tag, platform, &arch);
        let destination = tool.destination(&config.tool_cache_root);
        let bin_dir = match &self.binaries_location {
            Some(sub) => destination.join(sub),
            None => destination.clone(),
        };

        Ok(ResolvedTool {
            cache_key: tool.cache_key(),
            query: AssetQuery::new(platform, arch),
            tool,
            destination,
            bin_dir,
        })
    }
}

/// A request with every derived value filled in.
#[derive(Debug, Clone)]
pub struct ResolvedTool {
    pub tool: ToolInfo,
    pub query: AssetQuery,
    /// Absent for floating tags.
    pub cache_key: Option<String>,
    pub destination: PathBuf,
    /// Directory that is finalized and exposed on the path.
    pub bin_dir: PathBuf,
}

/// What a successful run produced.
#[derive(Debug)]
pub struct InstallOutcome {
    pub tool: ToolInfo,
    pub bin_dir: PathBuf,
    pub cache_hit: bool,
    /// Name of the installed asset; `None` on a cache hit.
    pub asset: Option<String>,
    /// Per-file chmod outcomes; `None` on a cache hit.
    pub chmod: Option<ChmodReport>,
}

impl InstallOutcome {
    /// Whether any file could not be made executable.
    pub fn has_failures(&self) -> bool {
        self.chmod.as_ref().is_some_and(ChmodReport::has_failures)
    }
}

/// Run the full pipeline for one request.
pub async fn install(ctx: &Context, request: &InstallRequest) -> Result<InstallOutcome, InstallError> {
    let resolved = request.resolve(&ctx.host, &ctx.config)?;
    let tool = &resolved.tool;
    info!(%tool, dest = %resolved.destination.display(), "resolved install target");

    let cache_key = resolved.cache_key.as_deref().filter(|_| request.cache);
    if request.cache && cache_key.is_none() {
        ctx.reporter
            .info(&format!("Caching is skipped for floating tag '{}'", tool.tag));
    }

    if let Some(key) = cache_key {
        if restore_cached(ctx, key, &resolved.destination).await {
            ctx.reporter
                .success(&format!("Restored {tool} from cache"));
            return Ok(InstallOutcome {
                tool: resolved.tool.clone(),
                bin_dir: resolved.bin_dir.clone(),
                cache_hit: true,
                asset: None,
                chmod: None,
            });
        }
    }

    ctx.reporter.section("Fetching release");
    let release = fetch_release(ctx, tool).await?;
    let asset = resolved.query.select(&release.assets)?.clone();
    let kind = ArchiveKind::from_asset_name(&asset.name)?;
    ctx.reporter
        .info(&format!("Found {} in release {}", asset.name, release.tag_name));

    let staging = tempfile::Builder::new()
        .prefix("relfetch-")
        .tempdir()
        .map_err(|e| InstallError::context("Failed to create staging directory", e))?;
    let archive = staging.path().join(archive_file_name(&asset));

    ctx.reporter.section("Downloading");
    ctx.releases.download_asset(&asset, &archive).await?;

    ctx.reporter.section("Extracting");
    extract(ctx.extractor.clone(), archive, resolved.destination.clone(), kind).await?;

    let report = finalize_bin_dir(ctx, &resolved.bin_dir, request.mode).await?;
    for (path, err) in report.failures() {
        ctx.reporter
            .error(&format!("Failed to chmod {}: {err}", path.display()));
    }

    if let Some(key) = cache_key {
        store_cached(ctx, key, &resolved.destination).await?;
    }

    ctx.reporter.success(&format!("Installed {tool}"));
    Ok(InstallOutcome {
        tool: resolved.tool.clone(),
        bin_dir: resolved.bin_dir.clone(),
        cache_hit: false,
        asset: Some(asset.name),
        chmod: Some(report),
    })
}

async fn fetch_release(ctx: &Context, tool: &ToolInfo) -> Result<Release, InstallError> {
    let release = if tool.is_floating() {
        ctx.releases.latest_release(&tool.owner, &tool.project).await?
    } else {
        ctx.releases
            .release_by_tag(&tool.owner, &tool.project, &tool.tag)
            .await?
    };
    debug!(tag = %release.tag_name, assets = release.assets.len(), "release listing");
    Ok(release)
}

/// Local file name for a downloaded asset.
fn archive_file_name(asset: &ReleaseAsset) -> PathBuf {
    Path::new(&asset.name)
        .file_name()
        .map_or_else(|| PathBuf::from("asset"), PathBuf::from)
}

async fn extract(
    extractor: Arc<dyn Extractor>,
    archive: PathBuf,
    dest: PathBuf,
    kind: ArchiveKind,
) -> Result<(), InstallError> {
    let files = tokio::task::spawn_blocking(move || extractor.extract(&archive, &dest, kind))
        .await
        .map_err(|e| InstallError::context("Extraction task failed", e))??;
    debug!(files = files.len(), "extracted");
    Ok(())
}

async fn finalize_bin_dir(
    ctx: &Context,
    bin_dir: &Path,
    mode: FileMode,
) -> Result<ChmodReport, InstallError> {
    let chmod = ctx.chmod.clone();
    let dir = bin_dir.to_path_buf();
    let report = tokio::task::spawn_blocking(move || finalize::finalize(&dir, mode, chmod.as_ref()))
        .await
        .map_err(|e| InstallError::context("Permission task failed", e))??;
    Ok(report)
}

/// Returns `true` on a hit. Restore errors are reported and count as a miss.
async fn restore_cached(ctx: &Context, key: &str, destination: &Path) -> bool {
    match ctx.cache.restore(key, destination).await {
        Ok(hit) => {
            debug!(%key, hit, "cache lookup");
            hit
        }
        Err(e) => {
            ctx.reporter
                .warning(&format!("Failed to restore cache entry {key}: {e}"));
            false
        }
    }
}

/// Only a validation failure is fatal; races and storage hiccups are not.
async fn store_cached(ctx: &Context, key: &str, destination: &Path) -> Result<(), InstallError> {
    match ctx.cache.save(key, destination).await {
        SaveOutcome::Saved => {
            debug!(%key, "cache saved");
            Ok(())
        }
        SaveOutcome::ReservationConflict(msg) => {
            ctx.reporter.info(&msg);
            Ok(())
        }
        SaveOutcome::Invalid(msg) => Err(InstallError::CacheValidation(msg)),
        SaveOutcome::Failed(msg) => {
            ctx.reporter
                .warning(&format!("Failed to save cache entry {key}: {msg}"));
            Ok(())
        }
    }
}
