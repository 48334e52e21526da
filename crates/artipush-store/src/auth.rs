//! Ambient credentials for the Cloud Storage backend.
//!
//! artipush does not manage credentials. It picks up a bearer token that the
//! surrounding job already exported:
//!
//! ```sh
//! export ARTIPUSH_GCS_TOKEN="$(gcloud auth print-access-token)"
//! ```
//!
//! When `STORAGE_EMULATOR_HOST` is set (fake-gcs-server and friends), requests
//! go to the emulator and a token is optional.

use reqwest::RequestBuilder;

use crate::error::StoreError;
use crate::gcs::DEFAULT_ENDPOINT;

/// Environment variables checked for a bearer token, in order.
pub const TOKEN_VARS: [&str; 2] = ["ARTIPUSH_GCS_TOKEN", "GOOGLE_OAUTH_ACCESS_TOKEN"];

/// Environment variable pointing at a storage emulator.
pub const EMULATOR_VAR: &str = "STORAGE_EMULATOR_HOST";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

/// Endpoint and credentials a client should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambient {
    pub endpoint: String,
    pub credentials: Credentials,
}

/// Resolve endpoint and credentials from the process environment.
pub fn from_env(endpoint_override: Option<&str>) -> Result<Ambient, StoreError> {
    resolve(|key| std::env::var(key).ok(), endpoint_override)
}

/// Resolve endpoint and credentials using `lookup` for environment access.
///
/// Precedence for the endpoint: emulator host, explicit override, public API.
/// Without a token, the emulator or an explicit non-public endpoint is
/// required; requests then go out unauthenticated.
pub fn resolve(
    lookup: impl Fn(&str) -> Option<String>,
    endpoint_override: Option<&str>,
) -> Result<Ambient, StoreError> {
    let token = TOKEN_VARS
        .iter()
        .filter_map(|key| lookup(*key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty());

    let emulator = lookup(EMULATOR_VAR)
        .map(|host| host.trim().trim_end_matches('/').to_string())
        .filter(|host| !host.is_empty())
        .map(|host| {
            if host.contains("://") {
                host
            } else {
                format!("http://{host}")
            }
        });

    let custom_endpoint = emulator.or_else(|| {
        endpoint_override
            .map(|e| e.trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty() && e != DEFAULT_ENDPOINT)
    });

    match (custom_endpoint, token) {
        (Some(endpoint), Some(token)) => Ok(Ambient {
            endpoint,
            credentials: Credentials::Bearer(token),
        }),
        (Some(endpoint), None) => Ok(Ambient {
            endpoint,
            credentials: Credentials::Anonymous,
        }),
        (None, Some(token)) => Ok(Ambient {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials: Credentials::Bearer(token),
        }),
        (None, None) => Err(StoreError::Credentials(format!(
            "set one of {} or {EMULATOR_VAR}",
            TOKEN_VARS.join(", ")
        ))),
    }
}

/// Apply authentication to a request if credentials are present.
pub fn apply_auth(request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
    match credentials {
        Credentials::Bearer(token) => request.bearer_auth(token),
        Credentials::Anonymous => request,
    }
}
