use std::path::{Path, PathBuf};

/// Nearest directory at or above `start` that holds a file named `filename`.
pub fn find_ancestor_with(start: &Path, filename: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(filename).is_file())
        .map(Path::to_path_buf)
}

/// Create `path` and any missing parents. An existing directory is fine.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

/// Resolve a configured artifact path against the build output directory.
///
/// Absolute `relative` paths replace `base`, matching `Path::join`.
pub fn resolve_source(base: &Path, relative: &str) -> PathBuf {
    base.join(relative)
}
