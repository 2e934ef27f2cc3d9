//! The unified configuration loaded from `.hotpatch/`.

use hp_protocol::config_models::PatchSettings;
use hp_protocol::package_models::PackageConfig;
use serde::Serialize;

/// Unified application configuration loaded from the `.hotpatch/` directory.
///
/// - `config.toml`: pipeline settings
/// - `packages/*.yaml`: one resource package per file
///
/// # Example
///
/// ```rust,no_run
/// use hp_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} packages", config.packages.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppConfig {
    /// Settings from `config.toml`, or defaults when the file is missing.
    pub settings: PatchSettings,

    /// Package definitions, ordered by file name.
    pub packages: Vec<PackageConfig>,
}

impl AppConfig {
    pub fn package(&self, name: &str) -> Option<&PackageConfig> {
        self.packages.iter().find(|package| package.name == name)
    }
}
