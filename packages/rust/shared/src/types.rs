//! Core domain types for the site build.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DownloadMetadata
// ---------------------------------------------------------------------------

/// Version and size badges injected into the download page.
///
/// Only ever constructed complete; a run that cannot determine all three
/// values fails instead of producing a partial value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadMetadata {
    /// Embedded library version, e.g. `3.4.0`.
    pub version: String,
    /// Size of the unminified artifact, e.g. `100 kB`.
    pub development_size: String,
    /// Gzipped size of the minified artifact, e.g. `25 kB`.
    pub production_size: String,
}

// ---------------------------------------------------------------------------
// DocumentPage
// ---------------------------------------------------------------------------

/// A markdown page produced from an upstream document.
#[derive(Debug, Clone)]
pub struct DocumentPage {
    /// Upstream file the page was read from.
    pub source: PathBuf,
    /// Where the page is written inside the site.
    pub destination: PathBuf,
    /// Rewritten content, layout header included.
    pub content: String,
}

// ---------------------------------------------------------------------------
// Examples
// ---------------------------------------------------------------------------

/// A runnable example discovered in the site's examples directory.
#[derive(Debug, Clone)]
pub struct ExampleFile {
    /// Absolute path of the copied example.
    pub path: PathBuf,
    /// Display title, e.g. `Basic usage`.
    pub title: String,
    /// File name used for the raw-file link, e.g. `basic_usage.js`.
    pub url: String,
    /// Code fence language, taken from the extension (e.g. `js`).
    pub content_type: String,
    /// Verbatim file contents.
    pub code: String,
}

/// One line of the examples index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Display title.
    pub title: String,
    /// URL relative to the examples directory, e.g. `browser/basic.html.html`.
    pub url: String,
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// A library artifact copied into the site's asset directory.
#[derive(Debug, Clone, Serialize)]
pub struct SyncedArtifact {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_entry_serializes_for_templates() {
        let entry = IndexEntry {
            title: "Basic usage".into(),
            url: "basic_usage.js.html".into(),
        };
        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(value["title"], "Basic usage");
        assert_eq!(value["url"], "basic_usage.js.html");
    }

    #[test]
    fn download_metadata_roundtrip() {
        let meta = DownloadMetadata {
            version: "3.4.0".into(),
            development_size: "100 kB".into(),
            production_size: "25 kB".into(),
        };
        let json = serde_json::to_string(&meta).expect("serialize");
        let parsed: DownloadMetadata = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, meta);
    }
}
