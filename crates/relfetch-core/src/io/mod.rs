//! IO modules - side effects (network, filesystem)

pub mod cache;
pub mod extract;
pub mod release;
