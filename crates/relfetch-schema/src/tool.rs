//! Install target identity: repository, tag and resolved platform.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::platform::{ArchAliases, Platform};

/// Namespace prefix for every cache key.
pub const CACHE_NAMESPACE: &str = "relfetch";

/// Tag that always points at the newest release and is never cached.
pub const LATEST_TAG: &str = "latest";

/// Errors that can occur when parsing a repository slug.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The slug is not of the form `owner/project`.
    #[error("Invalid repository '{0}': expected owner/project")]
    Malformed(String),
}

/// Repository coordinates parsed from an `owner/project` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoSlug {
    /// Organization or user owning the repository.
    pub owner: String,
    /// Repository name.
    pub project: String,
}

impl std::str::FromStr for RepoSlug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || SlugError::Malformed(s.to_string());
        let (owner, project) = s.trim().split_once('/').ok_or_else(malformed)?;
        if owner.is_empty() || project.is_empty() || project.contains('/') {
            return Err(malformed());
        }
        Ok(Self {
            owner: owner.to_string(),
            project: project.to_string(),
        })
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.project)
    }
}

/// The single install target of a run.
///
/// Built once from resolved inputs and never mutated. `arch` holds the
/// canonical architecture token; the full alias set travels separately
/// because only matching needs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub project: String,
    /// Release tag, or `latest`.
    pub tag: String,
    /// Canonical platform token.
    pub platform: String,
    /// Canonical architecture token.
    pub arch: String,
}

impl ToolInfo {
    /// Assemble the install target from resolved parts.
    pub fn new(repo: &RepoSlug, tag: &str, platform: Platform, arch: &ArchAliases) -> Self {
        Self {
            owner: repo.owner.clone(),
            project: repo.project.clone(),
            tag: tag.to_string(),
            platform: platform.as_str().to_string(),
            arch: arch.canonical().to_string(),
        }
    }

    /// Whether the tag may resolve to different releases over time.
    pub fn is_floating(&self) -> bool {
        self.tag.is_empty() || self.tag == LATEST_TAG
    }

    /// `platform-arch` pair used in keys and paths.
    pub fn target(&self) -> String {
        format!("{}-{}", self.platform, self.arch)
    }

    /// Deterministic cache key, absent for floating tags.
    ///
    /// ```
    /// use relfetch_schema::ToolInfo;
    ///
    /// let tool = ToolInfo {
    ///     owner: "acme".into(),
    ///     project: "tool".into(),
    ///     tag: "v1.2.3".into(),
    ///     platform: "linux".into(),
    ///     arch: "x64".into(),
    /// };
    /// assert_eq!(
    ///     tool.cache_key().as_deref(),
    ///     Some("relfetch/acme/tool/v1.2.3/linux-x64")
    /// );
    /// ```
    pub fn cache_key(&self) -> Option<String> {
        if self.is_floating() {
            return None;
        }
        Some(format!(
            "{CACHE_NAMESPACE}/{}/{}/{}/{}",
            self.owner,
            self.project,
            self.tag,
            self.target()
        ))
    }

    /// Install directory under the tool cache root.
    ///
    /// Computed the same way whether caching is enabled or not.
    pub fn destination(&self, root: &Path) -> PathBuf {
        root.join(&self.owner)
            .join(&self.project)
            .join(&self.tag)
            .join(self.target())
    }
}

impl std::fmt::Display for ToolInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}@{} ({})",
            self.owner,
            self.project,
            self.tag,
            self.target()
        )
    }
}
