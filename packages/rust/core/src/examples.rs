//! Publish the upstream examples as site pages.
//!
//! Publishing runs three phases in order, each starting only after the
//! previous one finished:
//!
//! 1. **Clear**: remove the site's examples directory.
//! 2. **Copy**: copy the upstream examples, pointing script tags at the
//!    site's own copy of the library.
//! 3. **Generate**: write a `<file>.md` page next to every top-level script
//!    and browser example, then an `index.md` listing both groups.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument};

use sitesync_markdown::{EXAMPLE_TEMPLATE, INDEX_TEMPLATE, Rule, TemplateRenderer, rewrite};
use sitesync_shared::{ExampleFile, IndexEntry, Result, SiteConfig, SiteSyncError};

use crate::fsutil;

/// Name of the generated index page.
const INDEX_PAGE: &str = "index.md";

/// Phases of a publish run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamplePhase {
    Clear,
    Copy,
    Generate,
}

impl std::fmt::Display for ExamplePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Clear => "clear",
            Self::Copy => "copy",
            Self::Generate => "generate",
        };
        f.write_str(name)
    }
}

/// Result of a publish run.
#[derive(Debug, Clone)]
pub struct PublishResult {
    /// Files copied from upstream.
    pub files_copied: usize,
    /// Index entries for top-level scripts, in discovery order.
    pub files: Vec<IndexEntry>,
    /// Index entries for browser examples, in discovery order.
    pub browser_files: Vec<IndexEntry>,
}

/// Derive the display title from a file name: `basic_usage.js` → `Basic usage`.
pub fn example_title(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut chars = stem.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    capitalized.replace('_', " ")
}

/// Copies upstream examples and generates their pages.
#[derive(Debug, Clone)]
pub struct ExamplePublisher {
    config: Arc<SiteConfig>,
    renderer: TemplateRenderer,
    script_rules: Vec<Rule>,
}

impl ExamplePublisher {
    /// Build a publisher; fails if a template or rewrite rule is invalid.
    pub fn new(config: Arc<SiteConfig>) -> Result<Self> {
        let renderer = TemplateRenderer::with_site_templates(&config.layout_header)?;
        let script_rules = script_rules(&config)?;
        Ok(Self {
            config,
            renderer,
            script_rules,
        })
    }

    /// Run clear, copy and generate in sequence.
    #[instrument(skip_all, fields(src = %self.config.examples_src.display(), dest = %self.config.examples_dest.display()))]
    pub async fn publish(&self) -> Result<PublishResult> {
        debug!(phase = %ExamplePhase::Clear, "examples phase");
        self.clear().await?;

        debug!(phase = %ExamplePhase::Copy, "examples phase");
        let files_copied = self.copy().await?;

        debug!(phase = %ExamplePhase::Generate, "examples phase");
        let (files, browser_files) = self.generate().await?;

        info!(
            copied = files_copied,
            pages = files.len() + browser_files.len(),
            "examples published"
        );

        Ok(PublishResult {
            files_copied,
            files,
            browser_files,
        })
    }

    /// Remove the site's examples directory. A missing directory is fine.
    pub async fn clear(&self) -> Result<()> {
        let dest = &self.config.examples_dest;
        match tokio::fs::remove_dir_all(dest).await {
            Ok(()) => {
                debug!(path = %dest.display(), "removed examples directory");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SiteSyncError::io(dest, e)),
        }
    }

    /// Copy every upstream example file, rewriting library script paths in
    /// text files. Returns the number of files copied.
    pub async fn copy(&self) -> Result<usize> {
        let src = &self.config.examples_src;
        let files = fsutil::collect_files(src).await?;

        for source in &files {
            let relative = source.strip_prefix(src).unwrap_or(source.as_path());
            let destination = self.config.examples_dest.join(relative);

            let data = tokio::fs::read(source)
                .await
                .map_err(|e| SiteSyncError::io(source, e))?;

            match String::from_utf8(data) {
                Ok(text) => {
                    fsutil::write_file(&destination, rewrite(&text, &self.script_rules)).await?
                }
                Err(binary) => fsutil::write_file(&destination, binary.into_bytes()).await?,
            }
            debug!(path = %destination.display(), "copied example");
        }

        Ok(files.len())
    }

    /// Write one page per example plus the index page.
    pub async fn generate(&self) -> Result<(Vec<IndexEntry>, Vec<IndexEntry>)> {
        let dest = &self.config.examples_dest;

        let scripts = fsutil::list_files_with_extension(dest, &self.config.example_extension).await?;
        let files = self.generate_group(&scripts).await?;

        let browser_dir = dest.join(&self.config.browser_examples_dir);
        let browser = fsutil::list_files_with_extension(&browser_dir, "html").await?;
        let browser_files = self.generate_group(&browser).await?;

        let index = self.renderer.render(
            INDEX_TEMPLATE,
            &json!({
                "files": files,
                "browserFiles": browser_files,
            }),
        )?;
        fsutil::write_file(&dest.join(INDEX_PAGE), index).await?;

        Ok((files, browser_files))
    }

    async fn generate_group(&self, paths: &[std::path::PathBuf]) -> Result<Vec<IndexEntry>> {
        let mut entries = Vec::with_capacity(paths.len());

        for path in paths {
            let example = load_example(path).await?;
            let page = self.renderer.render(
                EXAMPLE_TEMPLATE,
                &json!({
                    "title": example.title,
                    "url": example.url,
                    "type": example.content_type,
                    "code": example.code,
                }),
            )?;

            let page_path = fsutil::with_appended_extension(&example.path, ".md");
            fsutil::write_file(&page_path, page).await?;
            debug!(path = %page_path.display(), title = %example.title, "wrote example page");

            let html = fsutil::with_appended_extension(&example.path, ".html");
            entries.push(IndexEntry {
                title: example.title,
                url: fsutil::relative_url(&self.config.examples_dest, &html),
            });
        }

        Ok(entries)
    }
}

/// The two script-tag rules: unminified and minified library paths.
fn script_rules(config: &SiteConfig) -> Result<Vec<Rule>> {
    [&config.development_artifact, &config.production_artifact]
        .into_iter()
        .map(|artifact| {
            let pattern = format!(r#"src=".*dist/{}""#, regex::escape(artifact));
            let replacement = format!(r#"src="{}/{artifact}""#, config.asset_url);
            Ok(Rule::new(&pattern, replacement)?.literal().first_only())
        })
        .collect()
}

async fn load_example(path: &Path) -> Result<ExampleFile> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| SiteSyncError::io(path, e))?;

    Ok(ExampleFile {
        path: path.to_path_buf(),
        title: example_title(path),
        url: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        content_type: path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default(),
        code: String::from_utf8_lossy(&data).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use sitesync_shared::AppConfig;

    use super::*;

    fn temp_site() -> (PathBuf, Arc<SiteConfig>) {
        let root = std::env::temp_dir().join(format!(
            "sitesync-examples-test-{}",
            uuid::Uuid::now_v7()
        ));
        let config = SiteConfig::resolve(&AppConfig::default(), &root).unwrap();
        (root, Arc::new(config))
    }

    fn write_upstream(root: &Path) {
        let src = root.join("node_modules/mathjs/examples");
        std::fs::create_dir_all(src.join("browser")).unwrap();
        std::fs::write(src.join("basic_usage.js"), "var math = require('../index');\n").unwrap();
        std::fs::write(src.join("parser.js"), "math.parser();\n").unwrap();
        std::fs::write(src.join("README.txt"), "not an example\n").unwrap();
        std::fs::write(
            src.join("browser/basic.html"),
            "<script src=\"../../dist/math.js\"></script>\n\
             <script src=\"../../dist/math.js\"></script>\n\
             <script src=\"../../dist/math.min.js\"></script>\n",
        )
        .unwrap();
        std::fs::write(src.join("browser/logo.png"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        std::fs::write(src.join(".eslintrc"), "{}").unwrap();
    }

    #[test]
    fn title_from_file_name() {
        assert_eq!(example_title(Path::new("basic_usage.js")), "Basic usage");
        assert_eq!(example_title(Path::new("parser.js")), "Parser");
        assert_eq!(example_title(Path::new("browser/rocket_trajectory.html")), "Rocket trajectory");
        assert_eq!(example_title(Path::new("_private.js")), " private");
    }

    #[test]
    fn script_rules_point_at_site_assets() {
        let (_, config) = temp_site();
        let rules = script_rules(&config).unwrap();
        let html = "<script src=\"../../dist/math.js\"></script>\n<script src=\"../dist/math.min.js\">";
        assert_eq!(
            rewrite(html, &rules),
            "<script src=\"/js/lib/math.js\"></script>\n<script src=\"/js/lib/math.min.js\">"
        );
    }

    #[tokio::test]
    async fn publish_generates_pages_and_index() {
        let (root, config) = temp_site();
        write_upstream(&root);
        let dest = root.join("examples");

        let publisher = ExamplePublisher::new(config).unwrap();
        let result = publisher.publish().await.unwrap();

        assert_eq!(result.files_copied, 5);
        assert_eq!(
            result.files,
            vec![
                IndexEntry { title: "Basic usage".into(), url: "basic_usage.js.html".into() },
                IndexEntry { title: "Parser".into(), url: "parser.js.html".into() },
            ]
        );
        assert_eq!(
            result.browser_files,
            vec![IndexEntry { title: "Basic".into(), url: "browser/basic.html.html".into() }]
        );

        let page = std::fs::read_to_string(dest.join("basic_usage.js.md")).unwrap();
        assert_eq!(
            page,
            "---\nlayout: default\n---\n\n\
             # Basic usage\n\n\
             Raw file: [basic_usage.js](basic_usage.js)\n\n\
             ```js\nvar math = require('../index');\n```\n"
        );

        let index = std::fs::read_to_string(dest.join("index.md")).unwrap();
        assert_eq!(
            index,
            "---\nlayout: default\n---\n\n\
             # Examples\n\n\
             - [Basic usage](basic_usage.js.html)\n\
             - [Parser](parser.js.html)\n\
             \n# Browser examples\n\n\
             - [Basic](browser/basic.html.html)\n"
        );

        // First occurrence of each library path is rewritten
        let html = std::fs::read_to_string(dest.join("browser/basic.html")).unwrap();
        assert_eq!(
            html,
            "<script src=\"/js/lib/math.js\"></script>\n\
             <script src=\"../../dist/math.js\"></script>\n\
             <script src=\"/js/lib/math.min.js\"></script>\n"
        );

        // Binary files are copied verbatim
        assert_eq!(
            std::fs::read(dest.join("browser/logo.png")).unwrap(),
            vec![0xff, 0xfe, 0x00, 0x80]
        );
        assert!(!dest.join("README.txt.md").exists());
        assert!(!dest.join(".eslintrc").exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn publish_clears_stale_files() {
        let (root, config) = temp_site();
        write_upstream(&root);
        let dest = root.join("examples");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("removed_upstream.js"), "old").unwrap();

        let publisher = ExamplePublisher::new(config).unwrap();
        let result = publisher.publish().await.unwrap();

        assert!(!dest.join("removed_upstream.js").exists());
        assert_eq!(result.files.len(), 2);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn publish_with_no_examples_renders_empty_index() {
        let (root, config) = temp_site();
        std::fs::create_dir_all(root.join("node_modules/mathjs/examples")).unwrap();

        let publisher = ExamplePublisher::new(config).unwrap();
        let result = publisher.publish().await.unwrap();

        assert_eq!(result.files_copied, 0);
        assert!(result.files.is_empty());
        assert!(result.browser_files.is_empty());

        let index = std::fs::read_to_string(root.join("examples/index.md")).unwrap();
        assert_eq!(
            index,
            "---\nlayout: default\n---\n\n# Examples\n\n\n# Browser examples\n\n"
        );

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn clear_missing_directory_is_ok() {
        let (_, config) = temp_site();
        let publisher = ExamplePublisher::new(config).unwrap();
        publisher.clear().await.unwrap();
    }

    #[tokio::test]
    async fn missing_upstream_examples_is_io_error() {
        let (root, config) = temp_site();
        let publisher = ExamplePublisher::new(config).unwrap();

        let err = publisher.publish().await.unwrap_err();
        assert!(matches!(err, SiteSyncError::Io { .. }));

        let _ = std::fs::remove_dir_all(&root);
    }
}
