use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// A step of the push sequence that can fail.
///
/// Steps run in declaration order; a push that fails stops at exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushStage {
    ClientInit,
    ObjectOpen,
    SourceOpen,
    Upload,
    Commit,
    Metadata,
    UrlParse,
}

impl PushStage {
    /// Short human-readable label used in status lines and error messages.
    pub fn label(self) -> &'static str {
        match self {
            PushStage::ClientInit => "client init",
            PushStage::ObjectOpen => "object open",
            PushStage::SourceOpen => "source open",
            PushStage::Upload => "upload",
            PushStage::Commit => "commit",
            PushStage::Metadata => "metadata fetch",
            PushStage::UrlParse => "url parse",
        }
    }
}

impl fmt::Display for PushStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unified error type for all artipush operations.
#[derive(Debug, Error, Diagnostic)]
pub enum PublishError {
    /// A required configuration field is empty or the config could not be loaded.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Set `source`, `name` and `bucket` in Artipush.toml or pass them as flags"))]
    Config { message: String },

    /// The object-store client could not be constructed.
    #[error("Failed to create storage client: {message}")]
    #[diagnostic(help(
        "Export ARTIPUSH_GCS_TOKEN or GOOGLE_OAUTH_ACCESS_TOKEN, or set STORAGE_EMULATOR_HOST"
    ))]
    ClientInit { message: String },

    /// The local artifact could not be opened.
    #[error("Failed to open source artifact {}: {message}", path.display())]
    LocalFile { path: PathBuf, message: String },

    /// Opening the remote writer or transferring bytes failed.
    #[error("Upload failed during {stage}: {message}")]
    Upload { stage: PushStage, message: String },

    /// Finalizing the remote write failed; the object may or may not exist.
    #[error("Failed to commit upload: {message}")]
    Commit { message: String },

    /// The object was written but its attributes could not be fetched.
    #[error("Failed to fetch uploaded object attributes: {message}")]
    Metadata { message: String },

    /// The store returned a link that is not a valid URL.
    #[error("Invalid object URL '{url}': {message}")]
    UrlParse { url: String, message: String },

    /// I/O operation failed outside of a push stage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl PublishError {
    /// The push stage this error originated from, if any.
    pub fn stage(&self) -> Option<PushStage> {
        match self {
            PublishError::ClientInit { .. } => Some(PushStage::ClientInit),
            PublishError::LocalFile { .. } => Some(PushStage::SourceOpen),
            PublishError::Upload { stage, .. } => Some(*stage),
            PublishError::Commit { .. } => Some(PushStage::Commit),
            PublishError::Metadata { .. } => Some(PushStage::Metadata),
            PublishError::UrlParse { .. } => Some(PushStage::UrlParse),
            PublishError::Config { .. } | PublishError::Io(_) | PublishError::Generic { .. } => {
                None
            }
        }
    }
}
