//! Shared types, error model, and configuration for sitesync.
//!
//! This crate is the foundation depended on by all other sitesync crates.
//! It provides:
//! - [`SiteSyncError`] is the unified error type
//! - Domain types ([`DocumentPage`], [`DownloadMetadata`], [`ExampleFile`], [`IndexEntry`])
//! - Configuration ([`AppConfig`], [`SiteConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, DependencyConfig, SiteConfig, SitePathsConfig, UpstreamConfig,
    config_file_path, init_config, layout_header, load_config, load_config_from,
};
pub use error::{Result, SiteSyncError};
pub use types::{DocumentPage, DownloadMetadata, ExampleFile, IndexEntry, SyncedArtifact};
