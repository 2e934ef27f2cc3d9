//! Package definition models for `.hotpatch/packages/*.yaml`.
//!
//! A package is the unit the patch pipeline updates. Each definition names
//! the package, the play mode the provider runs it in, and optionally a
//! snapshot of the remote side used when the provider is simulated.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// How the resource provider sources a package's content.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayMode {
    /// Content is read straight from the authoring workspace.
    EditorSimulate,

    /// Only content shipped with the application is used.
    Offline,

    /// Content is fetched from a remote host and cached locally.
    #[default]
    Host,

    /// Content is streamed from the web without a local cache.
    Web,
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayMode::EditorSimulate => "editor-simulate",
            PlayMode::Offline => "offline",
            PlayMode::Host => "host",
            PlayMode::Web => "web",
        };
        f.write_str(name)
    }
}

/// A single file published on the remote side.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct RemoteFile {
    /// File (bundle) name as reported in download errors.
    pub name: String,

    /// Size in bytes.
    pub size: u64,

    /// Number of leading download attempts that fail for this file.
    ///
    /// Used by the simulated provider to exercise per-file error reporting.
    #[serde(default)]
    pub failed_attempts: u32,
}

/// The remote state of a package: its latest version and the files that the
/// local cache is missing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct RemoteSnapshot {
    /// Version token returned by a version request.
    pub version: String,

    /// Files pending download for this version.
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

impl RemoteSnapshot {
    /// Total bytes across all pending files.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|file| file.size).sum()
    }
}

/// Represents a package definition loaded from `.hotpatch/packages/*.yaml`.
///
/// # Example
///
/// ```yaml
/// name: DefaultPackage
/// play-mode: HOST
/// remote:
///   version: "2024-06-01-1200"
///   files:
///     - name: ui.bundle
///       size: 524288
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct PackageConfig {
    /// Unique package name passed to the provider.
    pub name: String,

    /// Play mode the provider initializes the package with.
    #[serde(default)]
    pub play_mode: PlayMode,

    /// Remote snapshot served by the simulated provider.
    #[serde(default)]
    pub remote: Option<RemoteSnapshot>,
}
