//! Post-extraction permissions.
//!
//! Every regular file directly under the bin directory gets the configured
//! mode. Failures are collected per file rather than aborting the loop, so
//! one unreadable entry does not leave the remaining binaries unusable.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum FinalizeError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No files found in {0}; the archive contained no usable binaries")]
    NoBinaries(PathBuf),
}

/// Octal permission mode given in symbolic form (`"755"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(u32);

impl Default for FileMode {
    fn default() -> Self {
        Self(0o755)
    }
}

impl FileMode {
    /// Parse octal digits such as `755` or `0755`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let octal = trimmed.bytes().all(|b| matches!(b, b'0'..=b'7'));
        if trimmed.is_empty() || trimmed.len() > 4 || !octal {
            return Err(ConfigError::InvalidMode(raw.to_string()));
        }
        u32::from_str_radix(trimmed, 8)
            .map(Self)
            .map_err(|_| ConfigError::InvalidMode(raw.to_string()))
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:o}", self.0)
    }
}

/// Outcome of changing one file's mode.
#[derive(Debug)]
pub struct ChmodResult {
    pub path: PathBuf,
    pub result: io::Result<()>,
}

/// Per-file outcomes of a finalize pass.
#[derive(Debug, Default)]
pub struct ChmodReport {
    pub results: Vec<ChmodResult>,
}

impl ChmodReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &Path> {
        self.results
            .iter()
            .filter(|r| r.result.is_ok())
            .map(|r| r.path.as_path())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &io::Error)> {
        self.results
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.path.as_path(), e)))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Changes the mode of a single file.
pub trait Chmod: Send + Sync {
    fn chmod(&self, path: &Path, mode: FileMode) -> io::Result<()>;
}

/// Applies modes through the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsChmod;

impl Chmod for FsChmod {
    #[cfg(unix)]
    fn chmod(&self, path: &Path, mode: FileMode) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode.bits()))
    }

    #[cfg(not(unix))]
    fn chmod(&self, path: &Path, mode: FileMode) -> io::Result<()> {
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_readonly(mode.bits() & 0o200 == 0);
        fs::set_permissions(path, perms)
    }
}

/// Regular files directly under `dir`, sorted by name. Symlinks are not followed.
pub fn list_regular_files(dir: &Path) -> Result<Vec<PathBuf>, FinalizeError> {
    let io_err = |source| FinalizeError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Apply `mode` to every regular file directly under `dir`.
pub fn finalize(
    dir: &Path,
    mode: FileMode,
    chmod: &dyn Chmod,
) -> Result<ChmodReport, FinalizeError> {
    let files = list_regular_files(dir)?;
    if files.is_empty() {
        return Err(FinalizeError::NoBinaries(dir.to_path_buf()));
    }

    let results = files
        .into_iter()
        .map(|path| {
            let result = chmod.chmod(&path, mode);
            tracing::debug!(path = %path.display(), %mode, ok = result.is_ok(), "chmod");
            ChmodResult { path, result }
        })
        .collect();

    Ok(ChmodReport { results })
}
