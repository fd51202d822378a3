//! Persistent cache of installed trees.
//!
//! Layout: `<cache_dir>/<sha256(key)>/` holding
//! - `KEY`       the original key, for humans
//! - `.reserved` claimed with `create_new` by the first saver
//! - `.complete` written once `tree/` is fully copied
//! - `tree/`     the saved directory contents
//!
//! A `.reserved` without `.complete` older than the stale age belongs to a
//! saver that died mid-copy; the next save clears and reclaims it.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Longest key accepted by [`LocalCache`].
pub const MAX_KEY_LEN: usize = 512;

/// Age after which an unfinished reservation is considered abandoned.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(10 * 60);

const RESERVED: &str = ".reserved";
const COMPLETE: &str = ".complete";
const TREE: &str = "tree";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Cache task failed: {0}")]
    Task(String),
}

/// Result of saving a tree under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The entry was stored.
    Saved,
    /// Another run already claimed the key.
    ReservationConflict(String),
    /// The key or entry was rejected.
    Invalid(String),
    /// Storage failed for any other reason.
    Failed(String),
}

/// Save and restore directory trees by key.
#[async_trait]
pub trait ToolCache: Send + Sync {
    /// Populate `path` from the entry for `key`. Returns `false` on a miss.
    async fn restore(&self, key: &str, path: &Path) -> Result<bool, CacheError>;

    /// Store the contents of `path` under `key`.
    async fn save(&self, key: &str, path: &Path) -> SaveOutcome;
}

/// Cache rooted in a local directory.
#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
    stale_after: Duration,
}

impl LocalCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            stale_after: DEFAULT_STALE_AFTER,
        }
    }

    /// Override the age at which unfinished reservations are reclaimed.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Directory holding the entry for `key`.
    pub fn entry_dir(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(hex::encode(digest))
    }
}

/// Reasons a key is refused before touching disk.
pub fn validate_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("cache key must not be empty".to_string());
    }
    if key.len() > MAX_KEY_LEN {
        return Err(format!(
            "cache key is {} characters, limit is {MAX_KEY_LEN}",
            key.len()
        ));
    }
    if key.contains(',') {
        return Err(format!("cache key '{key}' must not contain commas"));
    }
    Ok(())
}

/// Copy the contents of `from` into `to`, keeping symlinks as links.
fn copy_tree(from: &Path, to: &Path) -> io::Result<u64> {
    fs::create_dir_all(to)?;
    let mut copied = 0;

    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(io::Error::other)?;
        let target = to.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link, &target)?;
            #[cfg(not(unix))]
            fs::copy(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn claim(entry: &Path) -> io::Result<()> {
    fs::create_dir_all(entry)?;
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(entry.join(RESERVED))
        .map(drop)
}

/// Reserved, never completed, and untouched for at least `stale_after`.
fn is_stale(entry: &Path, stale_after: Duration) -> bool {
    if entry.join(COMPLETE).exists() {
        return false;
    }
    fs::metadata(entry.join(RESERVED))
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.elapsed().ok())
        .is_some_and(|age| age >= stale_after)
}

fn save_blocking(entry: &Path, key: &str, path: &Path, stale_after: Duration) -> SaveOutcome {
    let conflict = || {
        SaveOutcome::ReservationConflict(format!("cache entry for '{key}' is already reserved"))
    };

    match claim(entry) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            if !is_stale(entry, stale_after) {
                return conflict();
            }
            debug!(%key, "reclaiming stale cache reservation");
            if let Err(e) = fs::remove_dir_all(entry) {
                return SaveOutcome::Failed(e.to_string());
            }
            match claim(entry) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return conflict(),
                Err(e) => return SaveOutcome::Failed(e.to_string()),
            }
        }
        Err(e) => return SaveOutcome::Failed(e.to_string()),
    }

    let stored = fs::write(entry.join("KEY"), key)
        .and_then(|()| copy_tree(path, &entry.join(TREE)))
        .and_then(|files| {
            if files == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("nothing to cache under {}", path.display()),
                ));
            }
            fs::write(entry.join(COMPLETE), b"")
        });

    match stored {
        Ok(()) => SaveOutcome::Saved,
        Err(e) => {
            // Drop the half-written entry so a later run can claim it.
            fs::remove_dir_all(entry).ok();
            if e.kind() == io::ErrorKind::InvalidInput {
                SaveOutcome::Invalid(e.to_string())
            } else {
                SaveOutcome::Failed(e.to_string())
            }
        }
    }
}

#[async_trait]
impl ToolCache for LocalCache {
    async fn restore(&self, key: &str, path: &Path) -> Result<bool, CacheError> {
        let entry = self.entry_dir(key);
        if !entry.join(COMPLETE).exists() {
            debug!(%key, "cache miss");
            return Ok(false);
        }

        let tree = entry.join(TREE);
        let dest = path.to_path_buf();
        let files = tokio::task::spawn_blocking(move || copy_tree(&tree, &dest))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))??;

        debug!(%key, files, "cache restored");
        Ok(true)
    }

    async fn save(&self, key: &str, path: &Path) -> SaveOutcome {
        if let Err(reason) = validate_key(key) {
            return SaveOutcome::Invalid(reason);
        }

        let entry = self.entry_dir(key);
        let key_owned = key.to_string();
        let path = path.to_path_buf();
        let stale_after = self.stale_after;
        tokio::task::spawn_blocking(move || save_blocking(&entry, &key_owned, &path, stale_after))
            .await
            .unwrap_or_else(|e| SaveOutcome::Failed(e.to_string()))
    }
}
