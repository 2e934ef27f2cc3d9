//! Event protocol between the resource provider, the orchestrator and hosts.
//!
//! Two event families flow through the system:
//! - `DownloadEvent`: pushed by a provider's downloader while files transfer
//! - `PatchEvent`: pushed by the orchestrator to the embedding host
//!
//! Both use tagged enum serialization so hosts written in other languages can
//! consume them as JSON:
//! ```json
//! {
//!   "type": "foundUpdateFiles",
//!   "payload": { "run_id": "uuid-here", "total_count": 5, "total_bytes": 1000000 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::patch_models::{Disposition, PatchStep};

/// Aggregate progress of a running download.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
pub struct DownloadProgress {
    pub total_count: u32,
    pub current_count: u32,
    pub total_bytes: u64,
    pub current_bytes: u64,
}

impl DownloadProgress {
    pub fn is_complete(&self) -> bool {
        self.current_count >= self.total_count
    }
}

/// Events pushed by a downloader while it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum DownloadEvent {
    /// Progress changed.
    Progress(DownloadProgress),

    /// A single file failed. The downloader may still retry it.
    FileError { file_name: String, error: String },
}

/// Events sent from the orchestrator to the host.
///
/// Each variant mirrors one host-facing callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum PatchEvent {
    /// The active step changed.
    StepChanged {
        #[ts(type = "string")]
        run_id: Uuid,
        step: PatchStep,
        previous: Option<PatchStep>,
    },

    /// Package initialization failed; waiting for a host retry.
    InitializeFailed {
        #[ts(type = "string")]
        run_id: Uuid,
    },

    /// Version request failed; waiting for a host retry.
    VersionRequestFailed {
        #[ts(type = "string")]
        run_id: Uuid,
    },

    /// Manifest update failed; waiting for a host retry.
    ManifestUpdateFailed {
        #[ts(type = "string")]
        run_id: Uuid,
    },

    /// Files are pending download; waiting for the host to confirm.
    FoundUpdateFiles {
        #[ts(type = "string")]
        run_id: Uuid,
        total_count: u32,
        total_bytes: u64,
    },

    /// Download progress changed.
    DownloadProgress {
        #[ts(type = "string")]
        run_id: Uuid,
        progress: DownloadProgress,
    },

    /// A single file failed to download.
    DownloadError {
        #[ts(type = "string")]
        run_id: Uuid,
        file_name: String,
        error: String,
    },

    /// The download as a whole failed; waiting for a host retry.
    DownloadFailed {
        #[ts(type = "string")]
        run_id: Uuid,
        reason: String,
    },

    /// The run is done.
    Finished {
        #[ts(type = "string")]
        run_id: Uuid,
        disposition: Disposition,
    },
}
