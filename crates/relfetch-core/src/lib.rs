//! Core of relfetch: the install pipeline and the collaborators it drives.
//!
//! The pipeline itself only makes decisions. Release lookups, downloads,
//! cache storage, extraction and chmod all go through traits held by
//! [`Context`], with GitHub, local-disk and native implementations as
//! defaults.

pub mod config;
pub mod context;
pub mod error;
pub mod finalize;
pub mod io;
pub mod paths;
pub mod pipeline;
pub mod reporter;

pub use config::Config;
pub use context::{Context, Host};
pub use error::InstallError;
pub use finalize::{ChmodReport, FileMode};
pub use pipeline::{InstallOutcome, InstallRequest, install};
pub use reporter::{NullReporter, Reporter};

/// User Agent string for API and download requests
pub const USER_AGENT: &str = concat!("relfetch/", env!("CARGO_PKG_VERSION"));
