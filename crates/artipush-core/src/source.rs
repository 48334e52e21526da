use std::path::{Path, PathBuf};

/// Where the previous build phase left its output.
///
/// The configured `source` is resolved against this directory at push time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: PathBuf,
}

impl SourceLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Full path of an artifact given relative to this location.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        artipush_util::fs::resolve_source(&self.path, relative)
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }
}
