//! Scripted provider for tests and simulated runs.
//!
//! `MockProvider` serves a fixed [`RemoteSnapshot`] and can be told to fail
//! the first N calls of each gate or of the aggregate download. Every call it
//! receives is recorded so callers can assert on what the pipeline asked for.

use crate::provider::base::{
    PackageDownloader, ProviderError, ProviderResult, ResourcePackageProvider,
};
use async_trait::async_trait;
use hp_protocol::ipc::{DownloadEvent, DownloadProgress};
use hp_protocol::package_models::{PlayMode, RemoteFile, RemoteSnapshot};
use hp_protocol::patch_models::Gate;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// A call received by a [`MockProvider`] or one of its downloaders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Initialize {
        mode: PlayMode,
        package: String,
    },
    RequestVersion {
        package: String,
    },
    UpdateManifest {
        package: String,
        version: String,
    },
    CreateDownloader {
        package: String,
        max_concurrency: u32,
        max_retries_per_file: u32,
    },
    BeginDownload {
        package: String,
    },
    ClearUnusedCache {
        package: String,
    },
}

#[derive(Debug, Default)]
struct Script {
    initialize_failures: u32,
    version_failures: u32,
    manifest_failures: u32,
    download_failures: u32,
    calls: Vec<ProviderCall>,
}

impl Script {
    /// Consume one scripted failure from `counter`, returning whether the
    /// current call should fail.
    fn take_failure(counter: &mut u32) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
struct Shared {
    remote: RemoteSnapshot,
    delay: Duration,
    script: Mutex<Script>,
}

impl Shared {
    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: ProviderCall) {
        self.script().calls.push(call);
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockProvider {
    shared: Arc<Shared>,
}

impl MockProvider {
    pub fn new(remote: RemoteSnapshot) -> Self {
        Self::with_delay(remote, Duration::ZERO)
    }

    /// A provider whose cache already holds everything for `version`.
    pub fn up_to_date(version: &str) -> Self {
        Self::new(RemoteSnapshot {
            version: version.to_string(),
            files: Vec::new(),
        })
    }

    /// A provider that waits `delay` before answering each call and before
    /// each file transfer.
    pub fn with_delay(remote: RemoteSnapshot, delay: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                remote,
                delay,
                script: Mutex::new(Script::default()),
            }),
        }
    }

    /// Fail the next `count` calls guarded by `gate`.
    pub fn fail_gate(self, gate: Gate, count: u32) -> Self {
        {
            let mut script = self.shared.script();
            match gate {
                Gate::Initialize => script.initialize_failures = count,
                Gate::RequestVersion => script.version_failures = count,
                Gate::UpdateManifest => script.manifest_failures = count,
            }
        }
        self
    }

    /// Fail the next `count` downloads as a whole, after their files ran.
    pub fn fail_downloads(self, count: u32) -> Self {
        self.shared.script().download_failures = count;
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.shared.script().calls.clone()
    }

    /// Versions passed to `update_manifest`, in order.
    pub fn manifest_versions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::UpdateManifest { version, .. } => Some(version),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ResourcePackageProvider for MockProvider {
    async fn initialize(&self, mode: PlayMode, package: &str) -> ProviderResult<()> {
        self.shared.record(ProviderCall::Initialize {
            mode,
            package: package.to_string(),
        });
        self.shared.pause().await;

        if Script::take_failure(&mut self.shared.script().initialize_failures) {
            return Err(ProviderError::Initialize(format!(
                "simulated failure initializing {package}"
            )));
        }
        Ok(())
    }

    async fn request_version(&self, package: &str) -> ProviderResult<String> {
        self.shared.record(ProviderCall::RequestVersion {
            package: package.to_string(),
        });
        self.shared.pause().await;

        if Script::take_failure(&mut self.shared.script().version_failures) {
            return Err(ProviderError::VersionRequest(format!(
                "simulated failure resolving version of {package}"
            )));
        }
        Ok(self.shared.remote.version.clone())
    }

    async fn update_manifest(&self, package: &str, version: &str) -> ProviderResult<()> {
        self.shared.record(ProviderCall::UpdateManifest {
            package: package.to_string(),
            version: version.to_string(),
        });
        self.shared.pause().await;

        if version != self.shared.remote.version {
            return Err(ProviderError::ManifestUpdate(format!(
                "unknown version {version:?} for {package}"
            )));
        }
        if Script::take_failure(&mut self.shared.script().manifest_failures) {
            return Err(ProviderError::ManifestUpdate(format!(
                "simulated failure updating manifest of {package}"
            )));
        }
        Ok(())
    }

    /// `max_concurrency` is only recorded in the call log; the returned
    /// downloader transfers files one at a time, in snapshot order.
    fn create_downloader(
        &self,
        package: &str,
        max_concurrency: u32,
        max_retries_per_file: u32,
    ) -> Arc<dyn PackageDownloader> {
        self.shared.record(ProviderCall::CreateDownloader {
            package: package.to_string(),
            max_concurrency,
            max_retries_per_file,
        });

        Arc::new(MockDownloader {
            package: package.to_string(),
            files: self.shared.remote.files.clone(),
            max_retries_per_file,
            shared: Arc::clone(&self.shared),
        })
    }

    async fn clear_unused_cache(&self, package: &str) -> ProviderResult<()> {
        self.shared.record(ProviderCall::ClearUnusedCache {
            package: package.to_string(),
        });
        self.shared.pause().await;
        Ok(())
    }
}

/// Sequential downloader over the snapshot's files. Each file is retried up
/// to `max_retries_per_file` times before it counts as failed.
struct MockDownloader {
    package: String,
    files: Vec<RemoteFile>,
    max_retries_per_file: u32,
    shared: Arc<Shared>,
}

#[async_trait]
impl PackageDownloader for MockDownloader {
    fn total_count(&self) -> u32 {
        u32::try_from(self.files.len()).unwrap_or(u32::MAX)
    }

    fn total_bytes(&self) -> u64 {
        self.files.iter().map(|file| file.size).sum()
    }

    async fn begin(&self, events: UnboundedSender<DownloadEvent>) -> ProviderResult<()> {
        self.shared.record(ProviderCall::BeginDownload {
            package: self.package.clone(),
        });

        let mut progress = DownloadProgress {
            total_count: self.total_count(),
            current_count: 0,
            total_bytes: self.total_bytes(),
            current_bytes: 0,
        };
        let _ = events.send(DownloadEvent::Progress(progress));

        let mut failed = Vec::new();
        for file in &self.files {
            let mut delivered = false;
            for attempt in 0..=self.max_retries_per_file {
                self.shared.pause().await;
                if attempt < file.failed_attempts {
                    let _ = events.send(DownloadEvent::FileError {
                        file_name: file.name.clone(),
                        error: format!("simulated transfer error on attempt {}", attempt + 1),
                    });
                    continue;
                }
                delivered = true;
                break;
            }

            if delivered {
                progress.current_count += 1;
                progress.current_bytes += file.size;
                let _ = events.send(DownloadEvent::Progress(progress));
            } else {
                failed.push(file.name.clone());
            }
        }

        if !failed.is_empty() {
            return Err(ProviderError::Download(format!(
                "{} file(s) exhausted their retries: {}",
                failed.len(),
                failed.join(", ")
            )));
        }
        if Script::take_failure(&mut self.shared.script().download_failures) {
            return Err(ProviderError::Download(
                "simulated failure verifying downloaded files".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn snapshot() -> RemoteSnapshot {
        RemoteSnapshot {
            version: "v2".to_string(),
            files: vec![
                RemoteFile {
                    name: "ui.bundle".to_string(),
                    size: 700,
                    failed_attempts: 0,
                },
                RemoteFile {
                    name: "audio.bundle".to_string(),
                    size: 300,
                    failed_attempts: 1,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_scripted_gate_failures() {
        let provider = MockProvider::new(snapshot()).fail_gate(Gate::Initialize, 2);

        assert!(provider.initialize(PlayMode::Host, "Default").await.is_err());
        assert!(provider.initialize(PlayMode::Host, "Default").await.is_err());
        assert!(provider.initialize(PlayMode::Host, "Default").await.is_ok());
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_request_version_and_manifest() {
        let provider = MockProvider::new(snapshot());

        let version = provider.request_version("Default").await.unwrap();
        assert_eq!(version, "v2");
        assert!(provider.update_manifest("Default", &version).await.is_ok());
        assert!(matches!(
            provider.update_manifest("Default", "v1").await,
            Err(ProviderError::ManifestUpdate(_))
        ));
        assert_eq!(provider.manifest_versions(), vec!["v2", "v1"]);
    }

    #[tokio::test]
    async fn test_downloader_reports_file_errors_and_progress() {
        let provider = MockProvider::new(snapshot());
        let downloader = provider.create_downloader("Default", 10, 3);
        assert_eq!(downloader.total_count(), 2);
        assert_eq!(downloader.total_bytes(), 1000);

        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(downloader.begin(tx).await.is_ok());

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        let errors = events
            .iter()
            .filter(|e| matches!(e, DownloadEvent::FileError { .. }))
            .count();
        assert_eq!(errors, 1);
        // ui.bundle lands before audio.bundle's first attempt fails.
        let ui_done = events
            .iter()
            .position(|e| matches!(e, DownloadEvent::Progress(p) if p.current_count == 1))
            .unwrap();
        let audio_error = events
            .iter()
            .position(|e| matches!(e, DownloadEvent::FileError { .. }))
            .unwrap();
        assert!(ui_done < audio_error);
        assert_eq!(
            provider.calls()[0],
            ProviderCall::CreateDownloader {
                package: "Default".to_string(),
                max_concurrency: 10,
                max_retries_per_file: 3,
            }
        );
        assert_eq!(
            events.last(),
            Some(&DownloadEvent::Progress(DownloadProgress {
                total_count: 2,
                current_count: 2,
                total_bytes: 1000,
                current_bytes: 1000,
            }))
        );
    }

    #[tokio::test]
    async fn test_downloader_fails_when_retries_exhausted() {
        let mut remote = snapshot();
        remote.files[1].failed_attempts = 5;
        let provider = MockProvider::new(remote);
        let downloader = provider.create_downloader("Default", 10, 2);

        let (tx, _rx) = mpsc::unbounded_channel();
        let result = downloader.begin(tx).await;
        assert!(matches!(
            result,
            Err(ProviderError::Download(msg)) if msg.contains("audio.bundle")
        ));
    }

    #[tokio::test]
    async fn test_scripted_download_failure() {
        let provider = MockProvider::new(snapshot()).fail_downloads(1);
        let downloader = provider.create_downloader("Default", 10, 3);

        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(downloader.begin(tx.clone()).await.is_err());
        assert!(downloader.begin(tx).await.is_ok());
    }
}
