//! Site configuration for sitesync.
//!
//! Config lives at `<site root>/sitesync.toml`. Every field has a default, so a
//! missing file or a partial file both resolve to a usable configuration.
//! The file schema ([`AppConfig`]) is resolved against the site root into the
//! immutable runtime [`SiteConfig`] that every component receives.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteSyncError};

/// Default configuration file name, relative to the site root.
pub const CONFIG_FILE_NAME: &str = "sitesync.toml";

// ---------------------------------------------------------------------------
// Config structs (matching sitesync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// The upstream library dependency.
    #[serde(default)]
    pub dependency: DependencyConfig,

    /// Layout of the upstream package, relative to the dependency root.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Layout of the generated site, relative to the site root.
    #[serde(default)]
    pub site: SitePathsConfig,
}

/// `[dependency]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Package name of the upstream library.
    #[serde(default = "default_package")]
    pub package: String,

    /// Directory the dependency is installed into, relative to the site root.
    #[serde(default = "default_dependency_root")]
    pub root: String,

    /// Command (argv) that fetches the latest version. Empty disables the step.
    #[serde(default = "default_update_command")]
    pub update_command: Vec<String>,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            package: default_package(),
            root: default_dependency_root(),
            update_command: default_update_command(),
        }
    }
}

fn default_package() -> String {
    "mathjs".into()
}
fn default_dependency_root() -> String {
    "node_modules/mathjs".into()
}
fn default_update_command() -> Vec<String> {
    vec!["npm".into(), "install".into(), "mathjs".into()]
}

/// `[upstream]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Distribution directory holding the built artifacts.
    #[serde(default = "default_dist_dir")]
    pub dist_dir: String,

    /// Markdown documentation tree.
    #[serde(default = "default_docs_dir")]
    pub docs_dir: String,

    /// Runnable examples tree.
    #[serde(default = "default_examples_dir")]
    pub examples_dir: String,

    /// Changelog file name.
    #[serde(default = "default_changelog")]
    pub changelog: String,

    /// Unminified library artifact file name.
    #[serde(default = "default_development_artifact")]
    pub development_artifact: String,

    /// Minified library artifact file name.
    #[serde(default = "default_production_artifact")]
    pub production_artifact: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            dist_dir: default_dist_dir(),
            docs_dir: default_docs_dir(),
            examples_dir: default_examples_dir(),
            changelog: default_changelog(),
            development_artifact: default_development_artifact(),
            production_artifact: default_production_artifact(),
        }
    }
}

fn default_dist_dir() -> String {
    "dist".into()
}
fn default_docs_dir() -> String {
    "docs".into()
}
fn default_examples_dir() -> String {
    "examples".into()
}
fn default_changelog() -> String {
    "HISTORY.md".into()
}
fn default_development_artifact() -> String {
    "math.js".into()
}
fn default_production_artifact() -> String {
    "math.min.js".into()
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitePathsConfig {
    /// Directory the library artifacts are copied into.
    #[serde(default = "default_lib_dir")]
    pub lib_dir: String,

    /// Public URL prefix of `lib_dir`, used when rewriting script tags.
    #[serde(default = "default_asset_url")]
    pub asset_url: String,

    /// Directory the transformed docs are written into.
    #[serde(default = "default_docs_dir")]
    pub docs_dir: String,

    /// Directory the examples and their generated pages are written into.
    #[serde(default = "default_examples_dir")]
    pub examples_dir: String,

    /// Directory receiving the lower-cased changelog.
    #[serde(default = "default_changelog_dir")]
    pub changelog_dir: String,

    /// Download page whose version and size badges are updated in place.
    #[serde(default = "default_download_page")]
    pub download_page: String,

    /// Layout name written into every page's front matter.
    #[serde(default = "default_layout")]
    pub layout: String,

    /// Extension of the top-level example scripts.
    #[serde(default = "default_example_extension")]
    pub example_extension: String,

    /// Subdirectory of the examples holding browser (HTML) examples.
    #[serde(default = "default_browser_examples_dir")]
    pub browser_examples_dir: String,
}

impl Default for SitePathsConfig {
    fn default() -> Self {
        Self {
            lib_dir: default_lib_dir(),
            asset_url: default_asset_url(),
            docs_dir: default_docs_dir(),
            examples_dir: default_examples_dir(),
            changelog_dir: default_changelog_dir(),
            download_page: default_download_page(),
            layout: default_layout(),
            example_extension: default_example_extension(),
            browser_examples_dir: default_browser_examples_dir(),
        }
    }
}

fn default_lib_dir() -> String {
    "js/lib".into()
}
fn default_asset_url() -> String {
    "/js/lib".into()
}
fn default_changelog_dir() -> String {
    ".".into()
}
fn default_download_page() -> String {
    "download.md".into()
}
fn default_layout() -> String {
    "default".into()
}
fn default_example_extension() -> String {
    "js".into()
}
fn default_browser_examples_dir() -> String {
    "browser".into()
}

// ---------------------------------------------------------------------------
// Site config (runtime, resolved against the site root)
// ---------------------------------------------------------------------------

/// Runtime configuration with every path resolved against the site root.
///
/// Built once per run and shared read-only between tasks.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Site root; the update command runs here.
    pub root: PathBuf,
    /// Update command argv (empty = skip).
    pub update_command: Vec<String>,

    /// Upstream distribution directory.
    pub dist_src: PathBuf,
    /// Upstream docs tree.
    pub docs_src: PathBuf,
    /// Upstream examples tree.
    pub examples_src: PathBuf,
    /// Upstream changelog file.
    pub changelog_src: PathBuf,

    /// Site asset directory.
    pub lib_dest: PathBuf,
    /// Site docs directory.
    pub docs_dest: PathBuf,
    /// Site examples directory.
    pub examples_dest: PathBuf,
    /// Destination of the lower-cased changelog.
    pub changelog_dest: PathBuf,
    /// Download page updated in place.
    pub download_page: PathBuf,

    /// Unminified artifact file name (e.g. `math.js`).
    pub development_artifact: String,
    /// Minified artifact file name (e.g. `math.min.js`).
    pub production_artifact: String,
    /// Public URL prefix of the asset directory, without trailing slash.
    pub asset_url: String,
    /// Changelog file name as it appears upstream (e.g. `HISTORY.md`).
    pub changelog_name: String,

    /// Front matter prepended to every generated page.
    pub layout_header: String,
    /// Extension of top-level example scripts, without the dot.
    pub example_extension: String,
    /// Browser examples subdirectory name.
    pub browser_examples_dir: String,
}

impl SiteConfig {
    /// Resolve an [`AppConfig`] against `root` and validate the result.
    pub fn resolve(config: &AppConfig, root: &Path) -> Result<Self> {
        let dependency_root = root.join(&config.dependency.root);
        let upstream = &config.upstream;
        let site = &config.site;

        let changelog_dest = root
            .join(&site.changelog_dir)
            .join(upstream.changelog.to_lowercase());

        let resolved = Self {
            root: root.to_path_buf(),
            update_command: config.dependency.update_command.clone(),
            dist_src: dependency_root.join(&upstream.dist_dir),
            docs_src: dependency_root.join(&upstream.docs_dir),
            examples_src: dependency_root.join(&upstream.examples_dir),
            changelog_src: dependency_root.join(&upstream.changelog),
            lib_dest: root.join(&site.lib_dir),
            docs_dest: root.join(&site.docs_dir),
            examples_dest: root.join(&site.examples_dir),
            changelog_dest,
            download_page: root.join(&site.download_page),
            development_artifact: upstream.development_artifact.clone(),
            production_artifact: upstream.production_artifact.clone(),
            asset_url: site.asset_url.trim_end_matches('/').to_string(),
            changelog_name: upstream.changelog.clone(),
            layout_header: layout_header(&site.layout),
            example_extension: site.example_extension.trim_start_matches('.').to_string(),
            browser_examples_dir: site.browser_examples_dir.clone(),
        };

        resolved.validate()?;
        Ok(resolved)
    }

    /// Path of the copied unminified artifact inside the site.
    pub fn development_artifact_path(&self) -> PathBuf {
        self.lib_dest.join(&self.development_artifact)
    }

    /// Path of the copied minified artifact inside the site.
    pub fn production_artifact_path(&self) -> PathBuf {
        self.lib_dest.join(&self.production_artifact)
    }

    /// Check that no two components write the same destination.
    fn validate(&self) -> Result<()> {
        let dirs = [
            ("lib_dir", &self.lib_dest),
            ("docs_dir", &self.docs_dest),
            ("examples_dir", &self.examples_dest),
        ];

        for (i, (name_a, a)) in dirs.iter().enumerate() {
            for (name_b, b) in &dirs[i + 1..] {
                if a.starts_with(b) || b.starts_with(a) {
                    return Err(SiteSyncError::config(format!(
                        "site.{name_a} ({}) and site.{name_b} ({}) overlap",
                        a.display(),
                        b.display()
                    )));
                }
            }
        }

        let files = [
            ("changelog destination", &self.changelog_dest),
            ("site.download_page", &self.download_page),
        ];
        for (file_name, file) in &files {
            if let Some((dir_name, _)) = dirs.iter().find(|(_, dir)| file.starts_with(dir)) {
                return Err(SiteSyncError::config(format!(
                    "{file_name} ({}) lies inside site.{dir_name}",
                    file.display()
                )));
            }
        }
        if self.changelog_dest == self.download_page {
            return Err(SiteSyncError::config(
                "changelog destination and site.download_page are the same file",
            ));
        }

        Ok(())
    }
}

/// Front matter block selecting the static site generator's layout.
pub fn layout_header(layout: &str) -> String {
    format!("---\nlayout: {layout}\n---\n\n")
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config file for a site root.
pub fn config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

/// Load the site config. Returns defaults if the file does not exist.
pub fn load_config(root: &Path) -> Result<AppConfig> {
    let path = config_file_path(root);

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the site config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteSyncError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SiteSyncError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file into the site root.
/// Returns the path to the created file.
pub fn init_config(root: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root).map_err(|e| SiteSyncError::io(root, e))?;

    let path = config_file_path(root);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SiteSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SiteSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("node_modules/mathjs"));
        assert!(toml_str.contains("HISTORY.md"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[dependency]
package = "otherlib"
update_command = []

[site]
layout = "page"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.dependency.package, "otherlib");
        assert!(config.dependency.update_command.is_empty());
        assert_eq!(config.dependency.root, "node_modules/mathjs");
        assert_eq!(config.site.layout, "page");
        assert_eq!(config.site.lib_dir, "js/lib");
        assert_eq!(config.upstream.production_artifact, "math.min.js");
    }

    #[test]
    fn resolve_joins_paths_against_root() {
        let root = Path::new("/srv/site");
        let site = SiteConfig::resolve(&AppConfig::default(), root).expect("resolve");

        assert_eq!(site.dist_src, Path::new("/srv/site/node_modules/mathjs/dist"));
        assert_eq!(site.changelog_src, Path::new("/srv/site/node_modules/mathjs/HISTORY.md"));
        assert_eq!(site.lib_dest, Path::new("/srv/site/js/lib"));
        assert_eq!(site.changelog_dest, Path::new("/srv/site/history.md"));
        assert_eq!(site.production_artifact_path(), Path::new("/srv/site/js/lib/math.min.js"));
        assert_eq!(site.layout_header, "---\nlayout: default\n---\n\n");
        assert_eq!(site.asset_url, "/js/lib");
    }

    #[test]
    fn resolve_rejects_nested_destinations() {
        let mut config = AppConfig::default();
        config.site.examples_dir = "docs/examples".into();

        let err = SiteConfig::resolve(&config, Path::new("/srv/site")).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn resolve_rejects_download_page_inside_docs() {
        let mut config = AppConfig::default();
        config.site.download_page = "docs/download.md".into();

        let err = SiteConfig::resolve(&config, Path::new("/srv/site")).unwrap_err();
        assert!(err.to_string().contains("inside site.docs_dir"));
    }

    #[test]
    fn load_missing_config_uses_defaults() {
        let root = std::env::temp_dir().join(format!("sitesync-config-{}", uuid::Uuid::now_v7()));
        let config = load_config(&root).expect("defaults");
        assert_eq!(config.site.download_page, "download.md");
    }

    #[test]
    fn init_then_load_roundtrip() {
        let root = std::env::temp_dir().join(format!("sitesync-config-{}", uuid::Uuid::now_v7()));
        let path = init_config(&root).expect("init");
        assert!(path.ends_with(CONFIG_FILE_NAME));

        let config = load_config(&root).expect("load");
        assert_eq!(config.upstream.changelog, "HISTORY.md");

        let _ = std::fs::remove_dir_all(&root);
    }
}
