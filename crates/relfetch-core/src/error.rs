//! Domain-specific errors for the install pipeline

use relfetch_schema::{ArchiveError, MatchError, PlatformError, SlugError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::finalize::FinalizeError;
use crate::io::extract::ExtractError;
use crate::io::release::ReleaseError;

#[derive(Error, Debug)]
pub enum InstallError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Repo(#[from] SlugError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to fetch release: {0}")]
    Release(#[from] ReleaseError),

    #[error(transparent)]
    NoMatch(#[from] MatchError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Finalize(#[from] FinalizeError),

    #[error("Cache validation failed: {0}")]
    CacheValidation(String),

    #[error("{context}: {message}")]
    Context {
        context: &'static str,
        message: String,
    },
}

impl InstallError {
    /// Create an error with context for better debugging.
    pub fn context(ctx: &'static str, msg: impl std::fmt::Display) -> Self {
        Self::Context {
            context: ctx,
            message: msg.to_string(),
        }
    }
}
