//! Release asset selection.
//!
//! Asset names are free-form (`tool_1.2.3_Linux_x86_64.tar.gz`,
//! `tool-amd64-linux.zip`, ...). Instead of one combined pattern, a name is
//! accepted when three independent predicates hold on its lowercased form:
//! it contains the platform token, it contains any architecture alias, and
//! it ends with a matching archive suffix. Platform and architecture may
//! appear in either order.

use serde::{Deserialize, Serialize};

use crate::platform::{ArchAliases, Platform};

/// Archive suffixes considered during matching.
///
/// `.tar.bz2` is extractable (see [`crate::ArchiveKind`]) but is not listed
/// here, so bzip2 assets are never selected automatically.
// TODO: accept ".tar.bz2" here once the selection order between gzip and bzip2 twins is settled.
pub const MATCH_SUFFIXES: &[&str] = &[".tar.gz", ".zip"];

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// File name as listed in the release.
    pub name: String,
    /// Retrieval URL.
    pub url: String,
}

/// Release metadata: the resolved tag and its asset listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Concrete tag the release was published under.
    pub tag_name: String,
    /// Assets in the order the release lists them.
    pub assets: Vec<ReleaseAsset>,
}

/// Errors raised when no asset fits the host.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// No asset contained the platform, an arch alias and a matching suffix.
    #[error(
        "Could not find a release asset for {platform}/{arch}. Assets considered: [{}]",
        .candidates.join(", ")
    )]
    NoMatchingAsset {
        /// Platform token searched for.
        platform: String,
        /// Architecture aliases searched for, `|`-joined.
        arch: String,
        /// Every asset name that was considered.
        candidates: Vec<String>,
    },
}

/// Matching criteria for one install target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetQuery {
    platform: Platform,
    arch: ArchAliases,
}

impl AssetQuery {
    /// Build a query for a platform and its architecture alias set.
    pub fn new(platform: Platform, arch: ArchAliases) -> Self {
        Self { platform, arch }
    }

    /// Whether an asset name satisfies all three predicates.
    ///
    /// ```
    /// use relfetch_schema::{ArchAliases, AssetQuery, Platform};
    ///
    /// let query = AssetQuery::new(Platform::Linux, ArchAliases::from_token("x64"));
    /// assert!(query.matches("Tool_Linux_AMD64.tar.gz"));
    /// assert!(query.matches("tool-x86_64-linux.zip"));
    /// assert!(!query.matches("tool-linux-x86_64.tar.gz.sha256"));
    /// ```
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        name.contains(self.platform.as_str())
            && self.arch.found_in(&name)
            && MATCH_SUFFIXES.iter().any(|s| name.ends_with(s))
    }

    /// Pick the first asset, in listing order, that matches.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::NoMatchingAsset`] listing every asset name when
    /// nothing matches.
    pub fn select<'a>(&self, assets: &'a [ReleaseAsset]) -> Result<&'a ReleaseAsset, MatchError> {
        assets
            .iter()
            .find(|asset| self.matches(&asset.name))
            .ok_or_else(|| MatchError::NoMatchingAsset {
                platform: self.platform.to_string(),
                arch: self.arch.to_string(),
                candidates: assets.iter().map(|a| a.name.clone()).collect(),
            })
    }
}
