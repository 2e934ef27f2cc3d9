//! Patch pipeline run models.
//!
//! This module defines the identifiers of the eight pipeline steps, the
//! three retryable gates, and the structures that describe how far a run
//! got and how it ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

/// Discriminator of a patch pipeline step.
///
/// Steps normally run in declaration order. CreateDownloader jumps straight
/// to StartGame when nothing needs downloading.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
pub enum PatchStep {
    InitializePackage,
    RequestPackageVersion,
    UpdatePackageManifest,
    CreateDownloader,
    DownloadPackageFiles,
    DownloadPackageOver,
    ClearCacheBundle,
    StartGame,
}

impl PatchStep {
    /// Every step in pipeline order.
    pub const ALL: [PatchStep; 8] = [
        PatchStep::InitializePackage,
        PatchStep::RequestPackageVersion,
        PatchStep::UpdatePackageManifest,
        PatchStep::CreateDownloader,
        PatchStep::DownloadPackageFiles,
        PatchStep::DownloadPackageOver,
        PatchStep::ClearCacheBundle,
        PatchStep::StartGame,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PatchStep::InitializePackage => "InitializePackage",
            PatchStep::RequestPackageVersion => "RequestPackageVersion",
            PatchStep::UpdatePackageManifest => "UpdatePackageManifest",
            PatchStep::CreateDownloader => "CreateDownloader",
            PatchStep::DownloadPackageFiles => "DownloadPackageFiles",
            PatchStep::DownloadPackageOver => "DownloadPackageOver",
            PatchStep::ClearCacheBundle => "ClearCacheBundle",
            PatchStep::StartGame => "StartGame",
        }
    }
}

impl fmt::Display for PatchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A step that must succeed before the pipeline may advance.
///
/// Each gate owns its own bounded retry counter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gate {
    Initialize,
    RequestVersion,
    UpdateManifest,
}

impl Gate {
    /// The pipeline step guarded by this gate.
    pub fn step(&self) -> PatchStep {
        match self {
            Gate::Initialize => PatchStep::InitializePackage,
            Gate::RequestVersion => PatchStep::RequestPackageVersion,
            Gate::UpdateManifest => PatchStep::UpdatePackageManifest,
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gate::Initialize => "initialize",
            Gate::RequestVersion => "request-version",
            Gate::UpdateManifest => "update-manifest",
        };
        f.write_str(name)
    }
}

/// Lifecycle status of a patch pipeline run.
///
/// NotStarted -> Running -> Done
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    #[default]
    NotStarted,
    Running,
    Done,
}

/// How a finished run ended.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    /// The run reached StartGame.
    Succeeded,

    /// A gate step failed more often than the retry cap allows.
    RetryExhausted(Gate),

    /// The host abandoned the run.
    Aborted,
}

impl Disposition {
    pub fn is_success(&self) -> bool {
        matches!(self, Disposition::Succeeded)
    }
}

/// Current value of the three gate retry counters.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
pub struct RetryCounts {
    pub initialize: u32,
    pub request_version: u32,
    pub update_manifest: u32,
}

impl RetryCounts {
    pub fn get(&self, gate: Gate) -> u32 {
        match gate {
            Gate::Initialize => self.initialize,
            Gate::RequestVersion => self.request_version,
            Gate::UpdateManifest => self.update_manifest,
        }
    }

    /// Increments the counter for `gate` and returns its new value.
    pub fn bump(&mut self, gate: Gate) -> u32 {
        let counter = self.slot(gate);
        *counter += 1;
        *counter
    }

    pub fn reset(&mut self, gate: Gate) {
        *self.slot(gate) = 0;
    }

    pub fn reset_all(&mut self) {
        *self = Self::default();
    }

    fn slot(&mut self, gate: Gate) -> &mut u32 {
        match gate {
            Gate::Initialize => &mut self.initialize,
            Gate::RequestVersion => &mut self.request_version,
            Gate::UpdateManifest => &mut self.update_manifest,
        }
    }
}

/// Snapshot of a single patch pipeline run.
#[derive(Serialize, Deserialize, Debug, Clone, TS)]
pub struct PatchReport {
    /// Unique identifier for this run.
    #[ts(type = "string")]
    pub run_id: Uuid,

    /// Package being patched.
    pub package: String,

    pub status: PipelineStatus,

    /// Step active when the report was taken, if the run has started.
    pub current_step: Option<PatchStep>,

    /// Set once the run is Done.
    pub disposition: Option<Disposition>,

    pub retries: RetryCounts,

    pub started_at: Option<DateTime<Utc>>,

    pub finished_at: Option<DateTime<Utc>>,
}
