//! Archive format dispatch by file-name suffix.

use serde::{Deserialize, Serialize};

/// Errors raised when an asset cannot be extracted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// The asset's suffix is not a supported archive format.
    #[error("Unsupported archive format for asset: {0}")]
    Unsupported(String),
}

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveKind {
    /// Gzip-compressed tar archive (`.tar.gz`).
    TarGz,
    /// Bzip2-compressed tar archive (`.tar.bz2`).
    TarBz2,
    /// Zip archive (`.zip`).
    Zip,
}

impl ArchiveKind {
    /// Determine the format purely from the asset name, ignoring case.
    ///
    /// ```
    /// use relfetch_schema::ArchiveKind;
    ///
    /// assert_eq!(ArchiveKind::from_asset_name("tool.tar.bz2").unwrap().flag(), Some("xj"));
    /// assert!(ArchiveKind::from_asset_name("tool.tar.xz").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Unsupported`] naming the asset for any other suffix.
    #[allow(clippy::case_sensitive_file_extension_comparisons)]
    pub fn from_asset_name(name: &str) -> Result<Self, ArchiveError> {
        let lower = name.to_lowercase();
        if lower.ends_with(".tar.gz") {
            Ok(Self::TarGz)
        } else if lower.ends_with(".tar.bz2") {
            Ok(Self::TarBz2)
        } else if lower.ends_with(".zip") {
            Ok(Self::Zip)
        } else {
            Err(ArchiveError::Unsupported(name.to_string()))
        }
    }

    /// Extra tar mode flag required by the format.
    ///
    /// Only bzip2 archives need one (`xj`: extract, decompress bzip2).
    pub fn flag(&self) -> Option<&'static str> {
        match self {
            Self::TarBz2 => Some("xj"),
            Self::TarGz | Self::Zip => None,
        }
    }

    /// Canonical suffix of the format.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::TarGz => ".tar.gz",
            Self::TarBz2 => ".tar.bz2",
            Self::Zip => ".zip",
        }
    }
}

impl std::fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.suffix())
    }
}
