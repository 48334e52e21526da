use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use artipush_util::errors::PublishError;

/// Raw `[registry]` settings as written in `Artipush.toml` or passed as flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path to the build artifact, relative to the build output directory.
    #[serde(default)]
    pub source: String,
    /// Object name to create in the bucket.
    #[serde(default)]
    pub name: String,
    /// Destination bucket.
    #[serde(default)]
    pub bucket: String,
}

impl RegistryConfig {
    pub fn new(
        source: impl Into<String>,
        name: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            bucket: bucket.into(),
        }
    }

    /// Check that every required field is set.
    ///
    /// Only emptiness is checked here. Whether the file exists or the bucket
    /// is reachable is only known at push time.
    pub fn validate(self) -> Result<ValidatedConfig, PublishError> {
        if self.source.is_empty() {
            return Err(config_error("Source artifact should not be empty"));
        }
        if self.name.is_empty() {
            return Err(config_error("Name of the object should not be empty"));
        }
        if self.bucket.is_empty() {
            return Err(config_error("Bucket should not be empty"));
        }
        Ok(ValidatedConfig { inner: self })
    }

    /// Replace fields with any overrides that are present.
    pub fn merge(mut self, overrides: RegistryOverrides) -> Self {
        if let Some(source) = overrides.source {
            self.source = source;
        }
        if let Some(name) = overrides.name {
            self.name = name;
        }
        if let Some(bucket) = overrides.bucket {
            self.bucket = bucket;
        }
        self
    }
}

fn config_error(message: &str) -> PublishError {
    PublishError::Config {
        message: message.to_string(),
    }
}

/// Per-field overrides, typically from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct RegistryOverrides {
    pub source: Option<String>,
    pub name: Option<String>,
    pub bucket: Option<String>,
}

/// A [`RegistryConfig`] whose required fields are known to be non-empty.
///
/// Immutable once built; only [`RegistryConfig::validate`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    inner: RegistryConfig,
}

impl ValidatedConfig {
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn bucket(&self) -> &str {
        &self.inner.bucket
    }
}

/// Which object-store backend receives the upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Gcs,
    Local,
}

impl std::str::FromStr for StoreBackend {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gcs" => Ok(StoreBackend::Gcs),
            "local" => Ok(StoreBackend::Local),
            other => Err(config_error(&format!(
                "Unknown store backend '{other}' (expected 'gcs' or 'local')"
            ))),
        }
    }
}

/// `[store]` settings: where and how the upload is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Base URL of the storage API, overriding the public endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Root directory of the local backend.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Per-request timeout of the HTTP client, in seconds.
    #[serde(default, rename = "timeout-secs")]
    pub timeout_secs: Option<u64>,
}

/// Contents of an `Artipush.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl ProjectConfig {
    /// Load and parse an `Artipush.toml` file from the given path.
    ///
    /// Before parsing, `${env:VAR}` references are resolved using
    /// `.artipush.env` (if present alongside the file) and process
    /// environment variables.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PublishError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;

        let dir = path.parent().unwrap_or(Path::new("."));
        let env_file = dir.join(crate::ENV_FILE);
        let env_vars = match crate::properties::load_env_file(&env_file) {
            Ok(vars) => vars,
            Err(e) => {
                tracing::warn!(path = %env_file.display(), "ignoring env file: {e}");
                Default::default()
            }
        };
        let resolved = crate::properties::interpolate(&content, &env_vars);

        Self::from_str(&resolved)
    }

    /// Parse an `Artipush.toml` from a string (no interpolation).
    pub fn from_str(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            PublishError::Config {
                message: format!("Failed to parse {}: {e}", crate::CONFIG_FILE),
            }
            .into()
        })
    }
}
