use dirs::home_dir;
use std::path::PathBuf;

/// Returns the relfetch home directory, or None if the user's home cannot be resolved.
pub fn try_relfetch_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("RELFETCH_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".relfetch"))
}

/// Tool install root: `$RUNNER_TOOL_CACHE`, else ~/.relfetch/tools
pub fn default_tool_cache_root() -> Option<PathBuf> {
    if let Some(val) = std::env::var_os("RUNNER_TOOL_CACHE").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(val));
    }
    try_relfetch_home().map(|h| h.join("tools"))
}

/// Saved cache entries: `$RELFETCH_CACHE_DIR`, else ~/.relfetch/cache
pub fn default_cache_dir() -> Option<PathBuf> {
    if let Some(val) = std::env::var_os("RELFETCH_CACHE_DIR").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(val));
    }
    try_relfetch_home().map(|h| h.join("cache"))
}

