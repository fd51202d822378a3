//! Shared installation context.
//!
//! Groups the configuration and collaborator handles the pipeline needs so
//! they can be swapped out wholesale (tests use fakes for every one).

use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::error::InstallError;
use crate::finalize::{Chmod, FsChmod};
use crate::io::cache::{LocalCache, ToolCache};
use crate::io::extract::{Extractor, NativeExtractor};
use crate::io::release::{GithubClient, ReleaseSource};
use crate::reporter::Reporter;

/// Operating system and architecture as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub os: String,
    pub arch: String,
}

impl Host {
    /// Values of the running process (`std::env::consts`).
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

/// Groups common state used during installation operations.
#[derive(Clone)]
pub struct Context {
    pub config: Config,
    pub host: Host,
    pub releases: Arc<dyn ReleaseSource>,
    pub cache: Arc<dyn ToolCache>,
    pub extractor: Arc<dyn Extractor>,
    pub chmod: Arc<dyn Chmod>,
    pub reporter: Arc<dyn Reporter>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Context with the default collaborators: GitHub, local cache, native
    /// extraction and filesystem chmod.
    pub fn new(config: Config, reporter: Arc<dyn Reporter>) -> Result<Self, InstallError> {
        let releases = GithubClient::from_config(&config)?;
        let cache = LocalCache::new(config.cache_dir.clone());
        Ok(Self {
            config,
            host: Host::current(),
            releases: Arc::new(releases),
            cache: Arc::new(cache),
            extractor: Arc::new(NativeExtractor),
            chmod: Arc::new(FsChmod),
            reporter,
        })
    }

    pub fn with_host(mut self, host: Host) -> Self {
        self.host = host;
        self
    }

    pub fn with_releases(mut self, releases: Arc<dyn ReleaseSource>) -> Self {
        self.releases = releases;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ToolCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_chmod(mut self, chmod: Arc<dyn Chmod>) -> Self {
        self.chmod = chmod;
        self
    }
}
