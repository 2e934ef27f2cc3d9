//! Global configuration models for `.hotpatch/config.toml`.
//!
//! This module defines the settings that shape every patch pipeline run:
//! how often a gate step may be retried and how the downloader is tuned.

use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

/// Represents global settings from `.hotpatch/config.toml`.
///
/// # Example
///
/// ```toml
/// # .hotpatch/config.toml
/// max-gate-retries = 3
/// download-concurrency = 10
/// download-retries-per-file = 3
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct PatchSettings {
    /// How many host-driven retries each gate step accepts before the run
    /// gives up with a failed disposition.
    #[serde(default = "default_max_gate_retries")]
    pub max_gate_retries: u32,

    /// Maximum number of files the downloader fetches in parallel.
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: u32,

    /// Retries the provider performs per file before reporting it failed.
    #[serde(default = "default_download_retries_per_file")]
    pub download_retries_per_file: u32,
}

fn default_max_gate_retries() -> u32 {
    3
}

fn default_download_concurrency() -> u32 {
    10
}

fn default_download_retries_per_file() -> u32 {
    3
}

impl Default for PatchSettings {
    fn default() -> Self {
        Self {
            max_gate_retries: default_max_gate_retries(),
            download_concurrency: default_download_concurrency(),
            download_retries_per_file: default_download_retries_per_file(),
        }
    }
}
