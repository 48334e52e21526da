use serde::{Deserialize, Serialize};

/// Record handed to later pipeline stages after a successful push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Canonical object URL with the query string removed.
    #[serde(rename = "sourceURL")]
    pub source_url: String,
}

impl Artifact {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
        }
    }

    /// Serialize for cross-stage transport.
    pub fn to_json(&self) -> miette::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            artipush_util::errors::PublishError::Generic {
                message: format!("Failed to serialize artifact: {e}"),
            }
            .into()
        })
    }

    pub fn from_json(content: &str) -> miette::Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            artipush_util::errors::PublishError::Generic {
                message: format!("Failed to parse artifact record: {e}"),
            }
            .into()
        })
    }
}
