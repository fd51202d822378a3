//! Process-wide configuration.
//!
//! The pipeline never reads the environment itself. The CLI builds a
//! [`Config`] once (usually through [`Config::from_env`]) and hands it over;
//! tests construct one directly.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::paths;

/// Default GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine home directory. Set RELFETCH_HOME to override.")]
    NoHome,

    #[error("Invalid chmod mode '{0}': expected octal digits such as 755")]
    InvalidMode(String),

    #[error("Invalid binaries location '{0}': must be a relative path inside the install directory")]
    InvalidBinariesLocation(String),
}

/// Locations and credentials shared by every run.
#[derive(Clone)]
pub struct Config {
    /// Root under which tools are installed (`owner/project/tag/platform-arch`).
    pub tool_cache_root: PathBuf,
    /// Directory backing the local cache.
    pub cache_dir: PathBuf,
    /// Base URL of the GitHub REST API.
    pub api_url: String,
    /// Token sent as a bearer credential, if any.
    pub token: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("tool_cache_root", &self.tool_cache_root)
            .field("cache_dir", &self.cache_dir)
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Config {
    /// Configuration rooted at a single directory, with no token.
    pub fn with_root(root: &Path) -> Self {
        Self {
            tool_cache_root: root.join("tools"),
            cache_dir: root.join("cache"),
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `RUNNER_TOOL_CACHE` / `RELFETCH_HOME` pick the install root,
    /// `RELFETCH_CACHE_DIR` the cache, `GITHUB_API_URL` the API endpoint and
    /// `GITHUB_TOKEN` (or `GH_TOKEN`) the credential.
    pub fn from_env() -> Result<Self, ConfigError> {
        let tool_cache_root = paths::default_tool_cache_root().ok_or(ConfigError::NoHome)?;
        let cache_dir = paths::default_cache_dir().ok_or(ConfigError::NoHome)?;

        let api_url = std::env::var("GITHUB_API_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let token = std::env::var("GITHUB_TOKEN")
            .or_else(|_| std::env::var("GH_TOKEN"))
            .ok()
            .filter(|v| !v.is_empty());

        Ok(Self {
            tool_cache_root,
            cache_dir,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Replace the token (e.g. from an explicit `--token`).
    pub fn with_token(mut self, token: Option<String>) -> Self {
        if token.is_some() {
            self.token = token;
        }
        self
    }
}

/// Validate a binaries location relative to the install directory.
pub fn validate_binaries_location(raw: &str) -> Result<PathBuf, ConfigError> {
    let path = PathBuf::from(raw);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if raw.trim().is_empty() || escapes {
        return Err(ConfigError::InvalidBinariesLocation(raw.to_string()));
    }
    Ok(path)
}
