//! Turn `[store]` settings into a live client.

use std::time::Duration;

use async_trait::async_trait;

use artipush_core::config::{StoreBackend, StoreConfig};

use crate::error::StoreError;
use crate::gcs::{GcsClient, REQUEST_TIMEOUT};
use crate::local::LocalStore;
use crate::{ObjectStore, StoreConnector};

/// Connector driven by [`StoreConfig`] and the process environment.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredConnector {
    settings: StoreConfig,
}

impl ConfiguredConnector {
    pub fn new(settings: StoreConfig) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &StoreConfig {
        &self.settings
    }
}

#[async_trait]
impl StoreConnector for ConfiguredConnector {
    async fn connect(&self) -> Result<Box<dyn ObjectStore>, StoreError> {
        match self.settings.backend {
            StoreBackend::Gcs => {
                let timeout = self
                    .settings
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(REQUEST_TIMEOUT);
                let client = GcsClient::from_env(self.settings.endpoint.as_deref(), timeout)?;
                tracing::debug!(endpoint = %client.endpoint(), "connected to Cloud Storage");
                Ok(Box::new(client))
            }
            StoreBackend::Local => {
                let root = self.settings.root.as_deref().ok_or_else(|| {
                    StoreError::Settings("the local backend requires `root`".to_string())
                })?;
                let store = LocalStore::open(root)?;
                tracing::debug!(root = %store.root().display(), "opened local store");
                Ok(Box::new(store))
            }
        }
    }
}
