//! Embedded template files for `.hotpatch/` initialization.

use rust_embed::RustEmbed;

/// Files from the workspace `templates/` directory, embedded at compile time.
///
/// With the `debug-embed` feature the files are still read from disk in debug
/// builds, so template edits show up without recompiling.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../templates"]
pub struct TemplateAssets;

/// Get template file content by path relative to the templates root, e.g.
/// `"config.toml"` or `"packages/default.yaml"`.
///
/// # Example
/// ```
/// use hp_core::init::templates::get_template;
///
/// let config = get_template("config.toml").expect("config.toml should exist");
/// assert!(config.contains("max-gate-retries"));
/// ```
pub fn get_template(path: &str) -> Option<String> {
    TemplateAssets::get(path).map(|file| String::from_utf8_lossy(file.data.as_ref()).to_string())
}

/// List all template paths starting with `prefix`, sorted.
pub fn list_templates(prefix: &str) -> Vec<String> {
    let mut paths: Vec<String> = TemplateAssets::iter()
        .filter(|path| path.starts_with(prefix))
        .map(|path| path.to_string())
        .collect();
    paths.sort();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use hp_protocol::config_models::PatchSettings;
    use hp_protocol::package_models::PackageConfig;

    #[test]
    fn test_config_template_matches_defaults() {
        let content = get_template("config.toml").expect("config.toml should be embedded");
        let settings: PatchSettings = toml::from_str(&content).expect("valid settings");
        assert_eq!(settings, PatchSettings::default());
    }

    #[test]
    fn test_package_templates_parse() {
        let packages = list_templates("packages/");
        assert!(packages.contains(&"packages/default.yaml".to_string()));

        for path in packages {
            let content = get_template(&path).expect("listed template exists");
            let package: PackageConfig = serde_yaml::from_str(&content).expect("valid package");
            assert!(!package.name.is_empty(), "{path} has a name");
        }
    }

    #[test]
    fn test_default_package_has_pending_files() {
        let content = get_template("packages/default.yaml").expect("default package");
        let package: PackageConfig = serde_yaml::from_str(&content).expect("valid package");
        let remote = package.remote.expect("simulated remote");

        assert_eq!(remote.files.len(), 5);
        assert_eq!(remote.total_bytes(), 1_000_000);
    }

    #[test]
    fn test_get_nonexistent_template() {
        assert!(get_template("nonexistent.txt").is_none());
    }
}
