//! Error types for sitesync.
//!
//! Library crates use [`SiteSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all sitesync operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteSyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error (missing file, failed write, failed removal).
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The gzip codec failed while measuring an artifact.
    #[error("compression error: {0}")]
    Compression(String),

    /// The minified artifact carries no `@version` tag.
    #[error("version not found: no `@version` tag in {path:?}")]
    VersionNotFound { path: PathBuf },

    /// Version or one of the sizes could not be determined.
    #[error("incomplete download metadata: could not determine {}", missing.join(", "))]
    MetadataIncomplete { missing: Vec<String> },

    /// A template referenced a field that was not provided, or was malformed.
    #[error("failed to render template `{template}`: {message}")]
    TemplateRender { template: String, message: String },

    /// A task was not started because one of its prerequisites did not succeed.
    #[error("task `{task}` not started: prerequisite `{prerequisite}` did not succeed")]
    TaskDependency { task: String, prerequisite: String },

    /// A task action returned an error.
    #[error("task `{task}` failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<SiteSyncError>,
    },

    /// A task action panicked instead of returning.
    #[error("task panicked: {0}")]
    Panic(String),

    /// A task name that is not registered in the graph.
    #[error("unknown task `{0}`")]
    UnknownTask(String),

    /// The external dependency update command failed.
    #[error("dependency update failed: {0}")]
    Update(String),

    /// Data validation error (invalid graph, overlapping destinations, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SiteSyncError>;

impl SiteSyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a template error for the named template.
    pub fn template(template: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::TemplateRender {
            template: template.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short name of the error kind, used in run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "ConfigError",
            Self::Io { .. } => "IOError",
            Self::Compression(_) => "CompressionError",
            Self::VersionNotFound { .. } | Self::MetadataIncomplete { .. } => {
                "MetadataIncompleteError"
            }
            Self::TemplateRender { .. } => "TemplateRenderError",
            Self::TaskDependency { .. } => "TaskDependencyError",
            Self::TaskFailed { source, .. } => source.kind(),
            Self::Panic(_) => "PanicError",
            Self::UnknownTask(_) => "UnknownTaskError",
            Self::Update(_) => "UpdateError",
            Self::Validation { .. } => "ValidationError",
        }
    }
}
