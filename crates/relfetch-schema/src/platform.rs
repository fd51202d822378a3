//! Host platform and architecture resolution.
//!
//! Release assets name their target with free-form tokens. This module
//! reduces the host (or an explicit override) to the canonical platform
//! token and the set of architecture spellings an asset name may use.
//!
//! # Example
//!
//! ```
//! use relfetch_schema::{ArchAliases, Platform};
//!
//! let platform = Platform::resolve(None, "macos").unwrap();
//! assert_eq!(platform.as_str(), "darwin");
//!
//! let arch = ArchAliases::resolve(Some("x64"), "aarch64").unwrap();
//! assert_eq!(arch.tokens(), ["x64", "x86_64", "amd64"]);
//! ```

use serde::{Deserialize, Serialize};

/// Extra spellings accepted for the 64-bit x86 architecture.
const X64_ALIASES: [&str; 2] = ["x86_64", "amd64"];

/// Errors raised while resolving the install target.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The operating system is not linux, darwin or windows.
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The host architecture has no release token.
    #[error("Unsupported architecture: {0}")]
    UnsupportedArch(String),
}

/// Canonical operating system family used in asset matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Linux-based operating systems.
    Linux,
    /// Apple's kernel name, used for macOS assets.
    Darwin,
    /// Microsoft Windows.
    Windows,
}

impl Platform {
    /// Platform of the running process, if it is one of the supported families.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::UnsupportedPlatform`] on any other OS.
    pub fn host() -> Result<Self, PlatformError> {
        std::env::consts::OS.parse()
    }

    /// Resolve the platform from an optional override and the host OS name.
    ///
    /// A non-empty override wins over the host value. Both go through the
    /// same spelling table, so the result is always one of the three
    /// canonical tokens.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::UnsupportedPlatform`] when the chosen value
    /// is not a known spelling.
    pub fn resolve(over: Option<&str>, host_os: &str) -> Result<Self, PlatformError> {
        match over.map(str::trim).filter(|s| !s.is_empty()) {
            Some(explicit) => explicit.parse(),
            None => host_os.parse(),
        }
    }

    /// Canonical token as it appears in asset names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "darwin" | "macos" => Ok(Self::Darwin),
            "windows" | "win32" => Ok(Self::Windows),
            _ => Err(PlatformError::UnsupportedPlatform(s.to_string())),
        }
    }
}

/// Ordered set of architecture tokens treated as equivalent.
///
/// The first token is canonical and is the one used in cache keys and
/// install paths. Only `x64` carries aliases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchAliases(Vec<String>);

impl ArchAliases {
    /// Build the alias set for a literal architecture token.
    pub fn from_token(token: &str) -> Self {
        let token = token.trim().to_lowercase();
        let mut tokens = vec![token];
        if tokens[0] == "x64" {
            tokens.extend(X64_ALIASES.iter().map(|a| (*a).to_string()));
        }
        Self(tokens)
    }

    /// Architecture of the running process.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::UnsupportedArch`] when the host has no
    /// release token.
    pub fn host() -> Result<Self, PlatformError> {
        Self::resolve(None, std::env::consts::ARCH)
    }

    /// Resolve from an optional override and the host architecture.
    ///
    /// Overrides are taken literally. Host names follow Rust's
    /// `std::env::consts::ARCH` and are translated to release tokens
    /// (`x86_64` becomes `x64`, `aarch64` becomes `arm64`).
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::UnsupportedArch`] for an unknown host
    /// architecture when no override is given.
    pub fn resolve(over: Option<&str>, host_arch: &str) -> Result<Self, PlatformError> {
        if let Some(explicit) = over.map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(Self::from_token(explicit));
        }

        let token = match host_arch {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            "x86" => "ia32",
            "arm" => "arm",
            other => return Err(PlatformError::UnsupportedArch(other.to_string())),
        };
        Ok(Self::from_token(token))
    }

    /// Canonical token.
    pub fn canonical(&self) -> &str {
        &self.0[0]
    }

    /// All accepted tokens, canonical first.
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Whether `name` (already lowercased) contains any accepted token.
    pub fn found_in(&self, name: &str) -> bool {
        self.0.iter().any(|t| name.contains(t.as_str()))
    }
}

impl std::fmt::Display for ArchAliases {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("|"))
    }
}
