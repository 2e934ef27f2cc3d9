//! Directory structure and file generation for `.hotpatch/` initialization.

use super::error::{InitError, InitResult};
use super::templates::{get_template, list_templates};
use crate::config::loader::CONFIG_DIR;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Package written in minimal mode.
const MINIMAL_PACKAGE: &str = "packages/default.yaml";

/// Options for initializing a `.hotpatch/` directory.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Directory under which `.hotpatch/` is created.
    pub target_dir: PathBuf,

    /// Overwrite an existing `.hotpatch/` directory.
    pub force: bool,

    /// Only write the default package.
    pub minimal: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            force: false,
            minimal: false,
        }
    }
}

/// Generate a `.hotpatch/` directory from the embedded templates.
///
/// ```text
/// .hotpatch/
/// ├── config.toml
/// └── packages/
///     ├── default.yaml
///     └── rawfile.yaml (unless minimal)
/// ```
///
/// Returns the path of the generated directory.
///
/// # Errors
///
/// - `InitError::DirectoryExists` if `.hotpatch/` exists and `force` is unset
/// - `InitError::TemplateNotFound` if an embedded template is missing
/// - `InitError::DirectoryCreate` / `InitError::FileWrite` on I/O failures
pub async fn generate_hotpatch_structure(options: InitOptions) -> InitResult<PathBuf> {
    let hp_dir = options.target_dir.join(CONFIG_DIR);

    if hp_dir.exists() && !options.force {
        return Err(InitError::DirectoryExists(hp_dir));
    }

    let packages_dir = hp_dir.join("packages");
    fs::create_dir_all(&packages_dir).map_err(|source| InitError::DirectoryCreate {
        path: packages_dir.clone(),
        source,
    })?;

    write_template_file(&hp_dir, "config.toml")?;

    let packages = if options.minimal {
        vec![MINIMAL_PACKAGE.to_string()]
    } else {
        list_templates("packages/")
    };
    for package in &packages {
        write_template_file(&hp_dir, package)?;
    }

    info!(
        path = %hp_dir.display(),
        packages = packages.len(),
        "initialized hotpatch directory"
    );
    Ok(hp_dir)
}

fn write_template_file(hp_dir: &Path, template_path: &str) -> InitResult<()> {
    let content = get_template(template_path)
        .ok_or_else(|| InitError::TemplateNotFound(template_path.to_string()))?;

    let target_path = hp_dir.join(template_path);

    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|source| InitError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&target_path, content).map_err(|source| InitError::FileWrite {
        path: target_path.clone(),
        source,
    })?;
    debug!(path = %target_path.display(), "wrote template");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_generate_structure_full() {
        let dir = tempdir().unwrap();
        let options = InitOptions {
            target_dir: dir.path().to_path_buf(),
            force: false,
            minimal: false,
        };

        let hp_dir = generate_hotpatch_structure(options).await.unwrap();

        assert_eq!(hp_dir, dir.path().join(".hotpatch"));
        assert!(hp_dir.join("config.toml").exists());
        assert!(hp_dir.join("packages/default.yaml").exists());
        assert!(hp_dir.join("packages/rawfile.yaml").exists());

        let config = load_config(dir.path()).await.unwrap();
        assert_eq!(config.packages.len(), 2);
        assert!(config.package("DefaultPackage").is_some());
        assert!(config.package("RawFilePackage").is_some());
    }

    #[tokio::test]
    async fn test_generate_structure_minimal() {
        let dir = tempdir().unwrap();
        let options = InitOptions {
            target_dir: dir.path().to_path_buf(),
            force: false,
            minimal: true,
        };

        let hp_dir = generate_hotpatch_structure(options).await.unwrap();

        assert!(hp_dir.join("packages/default.yaml").exists());
        assert!(!hp_dir.join("packages/rawfile.yaml").exists());
    }

    #[tokio::test]
    async fn test_generate_structure_exists_without_force() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".hotpatch")).unwrap();

        let options = InitOptions {
            target_dir: dir.path().to_path_buf(),
            force: false,
            minimal: false,
        };

        let result = generate_hotpatch_structure(options).await;
        assert!(matches!(result, Err(InitError::DirectoryExists(_))));
    }

    #[tokio::test]
    async fn test_generate_structure_exists_with_force() {
        let dir = tempdir().unwrap();
        let hp_dir = dir.path().join(".hotpatch");
        fs::create_dir_all(&hp_dir).unwrap();
        fs::write(hp_dir.join("config.toml"), "max-gate-retries = 9").unwrap();

        let options = InitOptions {
            target_dir: dir.path().to_path_buf(),
            force: true,
            minimal: true,
        };

        generate_hotpatch_structure(options).await.unwrap();

        let config = load_config(dir.path()).await.unwrap();
        assert_eq!(config.settings.max_gate_retries, 3);
    }

    #[test]
    fn test_default_init_options() {
        let options = InitOptions::default();
        assert!(!options.force);
        assert!(!options.minimal);
    }
}
