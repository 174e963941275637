//! Library artifact handling for sitesync.
//!
//! - [`sync_artifacts`] copies the upstream distribution files into the site.
//! - [`MetadataExtractor`] measures the copied artifacts and reads their
//!   embedded version for the download page.

mod metadata;
mod sync;

pub use metadata::{MetadataExtractor, extract_version, format_size, gzip_len};
pub use sync::sync_artifacts;
