//! Resource package provider abstraction.
//!
//! The provider performs the actual work behind each pipeline step:
//! initializing a package, resolving its version, updating its manifest,
//! downloading files and pruning the cache. The orchestrator only sequences
//! these calls and reacts to their results.
//!
//! - [`base`]: the `ResourcePackageProvider` and `PackageDownloader` traits
//! - [`adapters`]: provider implementations

pub mod adapters;
pub mod base;

pub use base::{PackageDownloader, ProviderError, ProviderResult, ResourcePackageProvider};
