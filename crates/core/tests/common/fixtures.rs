//! Test fixtures: remote snapshots, mock providers and wired-up operations.

use async_trait::async_trait;
use hp_core::patch::PatchOperation;
use hp_core::provider::adapters::MockProvider;
use hp_core::provider::{PackageDownloader, ProviderResult, ResourcePackageProvider};
use hp_protocol::ipc::PatchEvent;
use hp_protocol::package_models::{PlayMode, RemoteFile, RemoteSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const PACKAGE: &str = "DefaultPackage";
pub const REMOTE_VERSION: &str = "2024-06-01";

/// Five files totaling 1,000,000 bytes. `flaky` fails once before the
/// downloader's own retry delivers it.
#[allow(dead_code)]
pub fn five_file_snapshot() -> RemoteSnapshot {
    let file = |name: &str, size: u64, failed_attempts: u32| RemoteFile {
        name: name.to_string(),
        size,
        failed_attempts,
    };

    RemoteSnapshot {
        version: REMOTE_VERSION.to_string(),
        files: vec![
            file("ui_main.bundle", 350_000, 0),
            file("characters.bundle", 300_000, 0),
            file("flaky.bundle", 200_000, 1),
            file("shaders.bundle", 100_000, 0),
            file("localization.bundle", 50_000, 0),
        ],
    }
}

#[allow(dead_code)]
pub fn snapshot_with(files: Vec<RemoteFile>) -> RemoteSnapshot {
    RemoteSnapshot {
        version: REMOTE_VERSION.to_string(),
        files,
    }
}

/// An operation for [`PACKAGE`] whose callbacks forward into the returned
/// receiver.
pub fn operation_with_events(
    provider: Arc<dyn ResourcePackageProvider>,
) -> (PatchOperation, mpsc::UnboundedReceiver<PatchEvent>) {
    let mut op = PatchOperation::new(PACKAGE, PlayMode::Host, provider);
    let (tx, rx) = mpsc::unbounded_channel();
    op.forward_events(tx);
    (op, rx)
}

/// Everything emitted so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<PatchEvent>) -> Vec<PatchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Let spawned provider calls finish, then apply their results with a single
/// tick, the way a frame-driven host would.
#[allow(dead_code)]
pub async fn settle_and_tick(op: &mut PatchOperation) -> usize {
    tokio::time::sleep(Duration::from_millis(5)).await;
    op.tick()
}

/// Panics inside its first `initialize`, then answers like the wrapped mock.
#[allow(dead_code)]
pub struct PanicsOnce {
    inner: MockProvider,
    panicked: AtomicBool,
}

#[allow(dead_code)]
impl PanicsOnce {
    pub fn new(inner: MockProvider) -> Self {
        Self {
            inner,
            panicked: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ResourcePackageProvider for PanicsOnce {
    async fn initialize(&self, mode: PlayMode, package: &str) -> ProviderResult<()> {
        if !self.panicked.swap(true, Ordering::SeqCst) {
            panic!("package engine crashed while initializing {package}");
        }
        self.inner.initialize(mode, package).await
    }

    async fn request_version(&self, package: &str) -> ProviderResult<String> {
        self.inner.request_version(package).await
    }

    async fn update_manifest(&self, package: &str, version: &str) -> ProviderResult<()> {
        self.inner.update_manifest(package, version).await
    }

    fn create_downloader(
        &self,
        package: &str,
        max_concurrency: u32,
        max_retries_per_file: u32,
    ) -> Arc<dyn PackageDownloader> {
        self.inner.create_downloader(package, max_concurrency, max_retries_per_file)
    }

    async fn clear_unused_cache(&self, package: &str) -> ProviderResult<()> {
        self.inner.clear_unused_cache(package).await
    }
}
