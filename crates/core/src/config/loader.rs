//! Configuration file loader for the `.hotpatch/` directory structure.
//!
//! - `config.toml`: pipeline settings
//! - `packages/*.yaml` / `packages/*.yml`: package definitions

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::AppConfig;
use hp_protocol::config_models::PatchSettings;
use hp_protocol::package_models::PackageConfig;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Name of the configuration directory under a project root.
pub const CONFIG_DIR: &str = ".hotpatch";

/// Loads all configuration from the `.hotpatch/` directory under `root`.
///
/// Missing directories or files yield defaults rather than errors.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read
/// - Files have invalid TOML or YAML syntax
/// - A package has an empty name or shares its name with another package
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let hp_dir = root.join(CONFIG_DIR);

    if !hp_dir.exists() {
        debug!(path = %hp_dir.display(), "no config directory, using defaults");
        return Ok(AppConfig::default());
    }

    let settings = load_settings(&hp_dir)?;
    let packages = load_packages(&hp_dir)?;

    debug!(
        path = %hp_dir.display(),
        packages = packages.len(),
        "configuration loaded"
    );
    Ok(AppConfig { settings, packages })
}

/// Loads pipeline settings from `config.toml`.
fn load_settings(hp_dir: &Path) -> ConfigResult<PatchSettings> {
    let config_path = hp_dir.join("config.toml");

    if !config_path.exists() {
        return Ok(PatchSettings::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: config_path,
        source,
    })
}

/// Loads all package definitions from `packages/*.yaml`.
fn load_packages(hp_dir: &Path) -> ConfigResult<Vec<PackageConfig>> {
    let packages_dir = hp_dir.join("packages");

    if !packages_dir.exists() {
        return Ok(Vec::new());
    }

    let mut packages = Vec::new();
    let mut seen = HashSet::new();

    for entry in WalkDir::new(&packages_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: packages_dir.clone(),
            source,
        })?;

        let path = entry.path();

        let ext = path.extension().and_then(|s| s.to_str());
        if ext != Some("yaml") && ext != Some("yml") {
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let package: PackageConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
                path: path.to_path_buf(),
                source,
            })?;

        if package.name.trim().is_empty() {
            return Err(ConfigError::InvalidConfig {
                path: path.to_path_buf(),
                reason: "package name must not be empty".to_string(),
            });
        }
        if !seen.insert(package.name.clone()) {
            return Err(ConfigError::InvalidConfig {
                path: path.to_path_buf(),
                reason: format!("duplicate package name '{}'", package.name),
            });
        }

        packages.push(package);
    }

    Ok(packages)
}
