//! relfetch - install a binary from a GitHub release
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Resolves the host platform and architecture, picks the matching release
//! asset, extracts it and exposes the result on the executable search path.
//!
//! # Directory Layout
//!
//! ```text
//! $RUNNER_TOOL_CACHE or ~/.relfetch/tools/
//! └── owner/project/tag/platform-arch/   # extracted release
//! ~/.relfetch/cache/
//! └── <sha256(key)>/tree/                # cached copies (fixed tags only)
//! ```
//!
//! Every flag falls back to the `INPUT_*` variable a workflow step would set,
//! so the binary works both interactively and as a CI step.

pub mod cmd;
pub mod ui;

use clap::Parser;

/// Value of `--cache` that turns caching on.
pub const CACHE_ENABLE: &str = "enable";

#[derive(Debug, Parser)]
#[command(name = "relfetch")]
#[command(author, version, about = "Install a binary from a GitHub release")]
pub struct Cli {
    /// Repository as owner/project
    #[arg(long, env = "INPUT_REPO")]
    pub repo: String,

    /// Release tag; `latest` follows the newest release
    #[arg(long, env = "INPUT_TAG", default_value = "latest")]
    pub tag: String,

    /// Platform override (linux, darwin, windows)
    #[arg(long, env = "INPUT_PLATFORM")]
    pub platform: Option<String>,

    /// Architecture override (x64, arm64, ...)
    #[arg(long, env = "INPUT_ARCH")]
    pub arch: Option<String>,

    /// Set to `enable` to cache the installed tree (fixed tags only)
    #[arg(long, env = "INPUT_CACHE")]
    pub cache: Option<String>,

    /// Octal mode applied to every extracted file
    #[arg(long, env = "INPUT_CHMOD", default_value = "755")]
    pub chmod: String,

    /// Subdirectory of the extracted release holding the binaries
    #[arg(long, env = "INPUT_BINARIES_LOCATION")]
    pub binaries_location: Option<String>,

    /// Token for the GitHub API
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl Cli {
    /// Whether `--cache` asked for caching.
    pub fn cache_enabled(&self) -> bool {
        self.cache
            .as_deref()
            .is_some_and(|v| v.trim() == CACHE_ENABLE)
    }
}

/// Treat blank inputs as absent; workflow runners pass unset inputs as "".
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
