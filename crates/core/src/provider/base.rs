//! Provider and downloader traits with their error type.

use async_trait::async_trait;
use hp_protocol::ipc::DownloadEvent;
use hp_protocol::package_models::PlayMode;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider not available: {0}")]
    NotAvailable(String),
    #[error("Package initialization failed: {0}")]
    Initialize(String),
    #[error("Version request failed: {0}")]
    VersionRequest(String),
    #[error("Manifest update failed: {0}")]
    ManifestUpdate(String),
    #[error("Download failed: {0}")]
    Download(String),
    #[error("Cache clear failed: {0}")]
    CacheClear(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// The external resource package engine driven by the patch pipeline.
#[async_trait]
pub trait ResourcePackageProvider: Send + Sync {
    async fn initialize(&self, mode: PlayMode, package: &str) -> ProviderResult<()>;

    /// Resolve the latest version token of `package`.
    async fn request_version(&self, package: &str) -> ProviderResult<String>;

    async fn update_manifest(&self, package: &str, version: &str) -> ProviderResult<()>;

    /// Compute the files `package` is missing and return a downloader for
    /// them. Nothing is transferred until [`PackageDownloader::begin`].
    fn create_downloader(
        &self,
        package: &str,
        max_concurrency: u32,
        max_retries_per_file: u32,
    ) -> Arc<dyn PackageDownloader>;

    /// Remove cached files no longer referenced by the active manifest.
    async fn clear_unused_cache(&self, package: &str) -> ProviderResult<()>;
}

/// A prepared download of a package's pending files.
#[async_trait]
pub trait PackageDownloader: Send + Sync {
    fn total_count(&self) -> u32;

    fn total_bytes(&self) -> u64;

    /// Download every pending file, pushing progress and per-file errors to
    /// `events` while running.
    ///
    /// Per-file errors are not fatal by themselves: the downloader retries
    /// files internally and only fails once a file exhausts its retries.
    async fn begin(&self, events: UnboundedSender<DownloadEvent>) -> ProviderResult<()>;
}
