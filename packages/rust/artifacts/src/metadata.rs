//! Download page metadata: artifact sizes and the embedded version.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use flate2::Compression;
use flate2::write::GzEncoder;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use sitesync_shared::{DownloadMetadata, Result, SiteConfig, SiteSyncError};

/// Render a byte count rounded to the nearest kilobyte, e.g. `100 kB`.
///
/// Halves round up, so 1536 bytes is `2 kB` and 511 bytes is `0 kB`.
pub fn format_size(bytes: usize) -> String {
    let kb = (bytes as f64 / 1024.0).round() as u64;
    format!("{kb} kB")
}

/// Length of `data` after gzip compression at the default level.
pub fn gzip_len(data: &[u8]) -> Result<usize> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SiteSyncError::Compression(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| SiteSyncError::Compression(e.to_string()))?;
    Ok(compressed.len())
}

/// Token of the first `@version` tag in `content`.
///
/// Only the first tag counts: an empty one yields `None` rather than falling
/// through to a later tag (e.g. a bundled dependency's banner).
pub fn extract_version(content: &str) -> Option<&str> {
    static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)@version\s*([\w.-]*)").expect("valid regex")
    });

    VERSION_RE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|token| !token.is_empty())
}

/// Reads the unminified and minified artifacts and derives [`DownloadMetadata`].
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    development: PathBuf,
    production: PathBuf,
}

impl MetadataExtractor {
    /// Measure `development` (raw size) and `production` (gzipped size and version).
    pub fn new(development: impl Into<PathBuf>, production: impl Into<PathBuf>) -> Self {
        Self {
            development: development.into(),
            production: production.into(),
        }
    }

    /// Measure the artifacts the site serves from its asset directory.
    pub fn for_site(config: &SiteConfig) -> Self {
        Self::new(
            config.development_artifact_path(),
            config.production_artifact_path(),
        )
    }

    /// Run the three reads concurrently and assemble the result.
    ///
    /// Every read is attempted and logged even when another fails; the error
    /// lists each value that could not be determined.
    #[instrument(skip_all, fields(development = %self.development.display(), production = %self.production.display()))]
    pub async fn extract(&self) -> Result<DownloadMetadata> {
        let (development_size, production_size, version) = tokio::join!(
            development_size(&self.development),
            production_size(&self.production),
            read_version(&self.production),
        );

        let mut missing = Vec::new();
        for (label, outcome) in [
            ("development size", &development_size),
            ("production size", &production_size),
            ("version", &version),
        ] {
            match outcome {
                Ok(value) => info!(value = %value, "{label}"),
                Err(e) => {
                    warn!(error = %e, "could not determine {label}");
                    missing.push(format!("{label} ({e})"));
                }
            }
        }

        match (development_size, production_size, version) {
            (Ok(development_size), Ok(production_size), Ok(version)) => Ok(DownloadMetadata {
                version,
                development_size,
                production_size,
            }),
            _ => Err(SiteSyncError::MetadataIncomplete { missing }),
        }
    }
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| SiteSyncError::io(path, e))?;
    debug!(path = %path.display(), bytes = data.len(), "read artifact");
    Ok(data)
}

async fn development_size(path: &Path) -> Result<String> {
    let data = read(path).await?;
    Ok(format_size(data.len()))
}

async fn production_size(path: &Path) -> Result<String> {
    let data = read(path).await?;
    Ok(format_size(gzip_len(&data)?))
}

async fn read_version(path: &Path) -> Result<String> {
    let data = read(path).await?;
    let content = String::from_utf8_lossy(&data);
    extract_version(&content)
        .map(str::to_string)
        .ok_or_else(|| SiteSyncError::VersionNotFound {
            path: path.to_path_buf(),
        })
}
