//! Shared types and decision logic for relfetch.
//!
//! Everything here is pure: platform resolution, cache key and destination
//! derivation, asset matching and archive dispatch. Network, cache storage
//! and decompression live in `relfetch-core`.

pub mod archive;
pub mod asset;
pub mod platform;
pub mod tool;

// Re-exports
pub use archive::*;
pub use asset::*;
pub use platform::*;
pub use tool::*;
