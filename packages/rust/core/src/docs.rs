//! Import the upstream markdown docs into the site.
//!
//! Links between docs are rewritten from `.md` to `.html`, references to the
//! changelog point at its lower-cased HTML page, and every page gets the
//! layout header.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument};

use sitesync_markdown::{Rule, prepend_header, rewrite};
use sitesync_shared::{DocumentPage, Result, SiteConfig};

use crate::fsutil;

/// Relative markdown links: `(guide/intro.md)`. Paths containing `:` (URLs)
/// never match.
static RELATIVE_MD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\([\w./]*)\.md(\))").expect("valid regex")
});

/// Rewrite rules for a docs page, in application order.
pub fn docs_rules(changelog_name: &str) -> Result<Vec<Rule>> {
    Ok(vec![
        Rule::new(&regex::escape(changelog_name), changelog_html_name(changelog_name))?.literal(),
        Rule::from_regex(RELATIVE_MD_LINK_RE.clone(), "${1}.html${2}"),
    ])
}

/// `HISTORY.md` → `history.html`.
pub fn changelog_html_name(changelog_name: &str) -> String {
    let stem = Path::new(changelog_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| changelog_name.to_lowercase());
    format!("{stem}.html")
}

/// Transform every `*.md` under the upstream docs tree into the site docs
/// directory, mirroring relative paths. Returns the pages written.
#[instrument(skip_all, fields(src = %config.docs_src.display(), dest = %config.docs_dest.display()))]
pub async fn import_docs(config: &SiteConfig) -> Result<Vec<DocumentPage>> {
    let rules = docs_rules(&config.changelog_name)?;
    let files = fsutil::collect_files(&config.docs_src).await?;

    let mut pages = Vec::new();
    for source in files {
        if source.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }

        let relative = source.strip_prefix(&config.docs_src).unwrap_or(source.as_path());
        let destination = config.docs_dest.join(relative);
        let content = fsutil::read_text(&source).await?;
        let content = prepend_header(&rewrite(&content, &rules), &config.layout_header);

        fsutil::write_file(&destination, &content).await?;
        debug!(path = %destination.display(), "wrote doc page");

        pages.push(DocumentPage {
            source,
            destination,
            content,
        });
    }

    info!(pages = pages.len(), "docs import complete");
    Ok(pages)
}
