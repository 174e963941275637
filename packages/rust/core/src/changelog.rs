//! Import the upstream changelog as a site page.

use tracing::{info, instrument};

use sitesync_markdown::prepend_header;
use sitesync_shared::{DocumentPage, Result, SiteConfig};

use crate::fsutil;

/// Copy the changelog to its lower-cased site path with the layout header.
#[instrument(skip_all, fields(src = %config.changelog_src.display()))]
pub async fn import_changelog(config: &SiteConfig) -> Result<DocumentPage> {
    let content = fsutil::read_text(&config.changelog_src).await?;
    let content = prepend_header(&content, &config.layout_header);

    fsutil::write_file(&config.changelog_dest, &content).await?;
    info!(dest = %config.changelog_dest.display(), "changelog imported");

    Ok(DocumentPage {
        source: config.changelog_src.clone(),
        destination: config.changelog_dest.clone(),
        content,
    })
}

#[cfg(test)]
mod tests {
    use sitesync_shared::{AppConfig, SiteSyncError};

    use super::*;

    #[tokio::test]
    async fn changelog_is_lower_cased_with_header() {
        let root = std::env::temp_dir().join(format!(
            "sitesync-changelog-test-{}",
            uuid::Uuid::now_v7()
        ));
        let upstream = root.join("node_modules/mathjs");
        std::fs::create_dir_all(&upstream).unwrap();
        std::fs::write(upstream.join("HISTORY.md"), "# History\n\n## 3.4.0\n").unwrap();
        let config = SiteConfig::resolve(&AppConfig::default(), &root).unwrap();

        let page = import_changelog(&config).await.unwrap();
        assert_eq!(page.destination, root.join("history.md"));

        let expected = "---\nlayout: default\n---\n\n# History\n\n## 3.4.0\n";
        assert_eq!(std::fs::read_to_string(root.join("history.md")).unwrap(), expected);

        import_changelog(&config).await.unwrap();
        assert_eq!(std::fs::read_to_string(root.join("history.md")).unwrap(), expected);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn missing_changelog_is_io_error() {
        let root = std::env::temp_dir().join(format!(
            "sitesync-changelog-test-{}",
            uuid::Uuid::now_v7()
        ));
        let config = SiteConfig::resolve(&AppConfig::default(), &root).unwrap();

        let err = import_changelog(&config).await.unwrap_err();
        assert!(matches!(err, SiteSyncError::Io { .. }));
        assert!(!root.join("history.md").exists());
    }
}
