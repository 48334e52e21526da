//! Operation: locate, load and merge the publish configuration.

use std::path::{Path, PathBuf};

use artipush_core::config::{ProjectConfig, RegistryOverrides, StoreBackend};
use artipush_core::CONFIG_FILE;
use artipush_util::errors::PublishError;
use artipush_util::fs::find_ancestor_with;

/// Command-line overrides of `[store]` settings.
#[derive(Debug, Clone, Default)]
pub struct StoreOverrides {
    pub backend: Option<StoreBackend>,
    pub endpoint: Option<String>,
    pub root: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

/// Configuration after file loading and overrides, not yet validated.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub project: ProjectConfig,
    /// Directory holding the config file, or the search start if none was found.
    pub base_dir: PathBuf,
    /// Config file that was read, if any.
    pub file: Option<PathBuf>,
}

/// Load configuration for a push.
///
/// An explicit `config_path` must exist. Otherwise `Artipush.toml` is looked
/// up from `cwd` upwards and is optional, since every field can come from flags.
/// A relative local-store root is resolved against the config directory.
pub fn load(
    cwd: &Path,
    config_path: Option<&Path>,
    registry: RegistryOverrides,
    store: StoreOverrides,
) -> miette::Result<LoadedConfig> {
    let file = match config_path {
        Some(path) => {
            let path = cwd.join(path);
            if !path.is_file() {
                return Err(PublishError::Config {
                    message: format!("Config file {} does not exist", path.display()),
                }
                .into());
            }
            Some(path)
        }
        None => find_ancestor_with(cwd, CONFIG_FILE).map(|dir| dir.join(CONFIG_FILE)),
    };

    let (mut project, base_dir) = match &file {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
            (ProjectConfig::from_path(path)?, dir)
        }
        None => (ProjectConfig::default(), cwd.to_path_buf()),
    };

    project.registry = project.registry.merge(registry);
    if let Some(backend) = store.backend {
        project.store.backend = backend;
    }
    if let Some(endpoint) = store.endpoint {
        project.store.endpoint = Some(endpoint);
    }
    match store.root {
        Some(root) => project.store.root = Some(cwd.join(root)),
        None => {
            if let Some(root) = project.store.root.take() {
                project.store.root = Some(base_dir.join(root));
            }
        }
    }
    if let Some(timeout) = store.timeout_secs {
        project.store.timeout_secs = Some(timeout);
    }

    Ok(LoadedConfig {
        project,
        base_dir,
        file,
    })
}
