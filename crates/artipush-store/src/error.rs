use miette::Diagnostic;
use thiserror::Error;

/// Failure talking to an object store.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// No usable credentials were found in the environment.
    #[error("No storage credentials: {0}")]
    Credentials(String),

    /// Store settings are unusable (bad endpoint, missing root, ...).
    #[error("Invalid store settings: {0}")]
    Settings(String),

    /// The object name cannot be mapped onto this store.
    #[error("Invalid object name '{0}'")]
    InvalidObjectName(String),

    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with an unexpected status code.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// The store answered, but not in the shape the protocol requires.
    #[error("Invalid response from store: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
