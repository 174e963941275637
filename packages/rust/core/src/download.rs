//! Update the version and size badges on the download page.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, instrument};

use sitesync_artifacts::MetadataExtractor;
use sitesync_markdown::{Rule, rewrite};
use sitesync_shared::{DownloadMetadata, Result, SiteConfig};

use crate::fsutil;

static VERSION_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(version [0-9]+\.[0-9]+\.[0-9]+(-SNAPSHOT)?\)").expect("valid regex")
});

/// Version segment of a CDN path, e.g. `/3.4.0/`.
static VERSION_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/[0-9]+\.[0-9]+\.[0-9]+(-SNAPSHOT)?/").expect("valid regex")
});

static DEVELOPMENT_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span id="development-size">[\w\s]*</span>"#).expect("valid regex")
});

static PRODUCTION_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span id="production-size">[\w\s]*</span>"#).expect("valid regex")
});

/// Rewrite rules injecting `meta` into the download page.
pub fn download_rules(meta: &DownloadMetadata) -> Vec<Rule> {
    vec![
        Rule::from_regex(VERSION_LABEL_RE.clone(), format!("(version {})", meta.version)).literal(),
        Rule::from_regex(VERSION_PATH_RE.clone(), format!("/{}/", meta.version)).literal(),
        Rule::from_regex(
            DEVELOPMENT_SIZE_RE.clone(),
            format!(r#"<span id="development-size">{}</span>"#, meta.development_size),
        )
        .literal(),
        Rule::from_regex(
            PRODUCTION_SIZE_RE.clone(),
            format!(r#"<span id="production-size">{}</span>"#, meta.production_size),
        )
        .literal(),
    ]
}

/// Apply [`download_rules`] to the page content.
pub fn update_download_page(content: &str, meta: &DownloadMetadata) -> String {
    rewrite(content, &download_rules(meta))
}

/// Measure the site's artifacts and rewrite the download page in place.
///
/// The page is only touched once all three values are known.
#[instrument(skip_all, fields(page = %config.download_page.display()))]
pub async fn update_download(config: &SiteConfig) -> Result<DownloadMetadata> {
    let meta = MetadataExtractor::for_site(config).extract().await?;

    let content = fsutil::read_text(&config.download_page).await?;
    let updated = update_download_page(&content, &meta);
    if updated != content {
        fsutil::write_file(&config.download_page, &updated).await?;
    }

    info!(
        version = %meta.version,
        development_size = %meta.development_size,
        production_size = %meta.production_size,
        changed = updated != content,
        "download page updated"
    );
    Ok(meta)
}
