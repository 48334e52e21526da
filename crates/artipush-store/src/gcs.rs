//! Google Cloud Storage backend over the JSON API.
//!
//! Uploads use a resumable session purely as a streaming transport: data is
//! sent in fixed-size chunks as it is written and the last chunk commits the
//! object. A failed chunk is reported, never resumed.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::auth::{self, Ambient, Credentials};
use crate::error::StoreError;
use crate::{ObjectAttrs, ObjectStore, ObjectWriter};

/// Public JSON API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Bytes sent per upload request. Must be a multiple of 256 KiB.
pub const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Default per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Build the reqwest client used for storage calls.
///
/// Redirects are disabled: the upload protocol answers intermediate chunks
/// with `308 Resume Incomplete`, which must reach the caller untouched.
pub fn build_client(timeout: Duration) -> Result<Client, StoreError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("artipush/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(StoreError::Http)
}

/// Cloud Storage client bound to one endpoint and one set of credentials.
#[derive(Debug, Clone)]
pub struct GcsClient {
    http: Client,
    endpoint: Url,
    credentials: Credentials,
}

impl GcsClient {
    pub fn new(ambient: Ambient, timeout: Duration) -> Result<Self, StoreError> {
        let endpoint = Url::parse(&ambient.endpoint)
            .map_err(|e| StoreError::Settings(format!("endpoint '{}': {e}", ambient.endpoint)))?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::Settings(format!(
                "endpoint '{}' cannot be used as a base URL",
                ambient.endpoint
            )));
        }
        Ok(Self {
            http: build_client(timeout)?,
            endpoint,
            credentials: ambient.credentials,
        })
    }

    /// Client using ambient credentials from the process environment.
    pub fn from_env(endpoint_override: Option<&str>, timeout: Duration) -> Result<Self, StoreError> {
        Self::new(auth::from_env(endpoint_override)?, timeout)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url_with_segments(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        // cannot_be_a_base was rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `POST` target that opens an upload session for `name`.
    pub fn upload_url(&self, bucket: &str, name: &str) -> Url {
        let mut url = self.url_with_segments(&["upload", "storage", "v1", "b", bucket, "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "resumable")
            .append_pair("name", name);
        url
    }

    /// Resource URL of an object; `name` is encoded as a single segment.
    pub fn object_url(&self, bucket: &str, name: &str) -> Url {
        self.url_with_segments(&["storage", "v1", "b", bucket, "o", name])
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        auth::apply_auth(self.http.request(method, url), &self.credentials)
    }

    async fn open_session(&self, bucket: &str, name: &str) -> Result<Url, StoreError> {
        let url = self.upload_url(bucket, name);
        tracing::debug!(%bucket, %name, "opening upload session");
        let resp = self
            .request(reqwest::Method::POST, url.clone())
            .header("X-Upload-Content-Type", "application/octet-stream")
            .body(Vec::<u8>::new())
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            return Err(status_error(resp, &url).await);
        }
        let location = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                StoreError::InvalidResponse("upload session has no Location header".to_string())
            })?;
        Url::parse(location)
            .map_err(|e| StoreError::InvalidResponse(format!("upload session URL: {e}")))
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn writer(&self, bucket: &str, name: &str) -> Result<Box<dyn ObjectWriter>, StoreError> {
        Ok(Box::new(GcsWriter::new(self.clone(), bucket, name)))
    }

    async fn attrs(&self, bucket: &str, name: &str) -> Result<ObjectAttrs, StoreError> {
        let url = self.object_url(bucket, name);
        let resp = self
            .request(reqwest::Method::GET, url.clone())
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            return Err(status_error(resp, &url).await);
        }
        let body = resp.text().await.map_err(transport_error)?;
        parse_object_resource(&body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    media_link: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    md5_hash: Option<String>,
}

/// Parse an object resource document into [`ObjectAttrs`].
pub fn parse_object_resource(body: &str) -> Result<ObjectAttrs, StoreError> {
    let resource: ObjectResource = serde_json::from_str(body)
        .map_err(|e| StoreError::InvalidResponse(format!("object resource: {e}")))?;
    let size = resource.size.as_deref().and_then(|s| s.parse::<u64>().ok());
    let md5 = resource.md5_hash.as_deref().and_then(|encoded| {
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).ok()?;
        <[u8; 16]>::try_from(bytes.as_slice()).ok()
    });
    Ok(ObjectAttrs {
        media_link: resource.media_link,
        size,
        md5,
    })
}

/// `Content-Range` header for a chunk starting at `offset`.
///
/// `total` is `None` while more chunks follow. An empty final chunk uses
/// the `bytes */N` form.
pub fn content_range(offset: u64, len: usize, total: Option<u64>) -> String {
    let total = total.map_or_else(|| "*".to_string(), |t| t.to_string());
    if len == 0 {
        format!("bytes */{total}")
    } else {
        format!("bytes {}-{}/{total}", offset, offset + len as u64 - 1)
    }
}

async fn status_error(resp: reqwest::Response, url: &Url) -> StoreError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    StoreError::Status {
        status,
        url: redact(url),
        body: body.chars().take(512).collect(),
    }
}

/// Transport failure with the request URL removed. Session URLs carry the
/// upload id, which grants write access to the object.
fn transport_error(e: reqwest::Error) -> StoreError {
    StoreError::Http(e.without_url())
}

/// Drop the query string so session tokens never reach logs.
fn redact(url: &Url) -> String {
    let mut clean = url.clone();
    clean.set_query(None);
    clean.to_string()
}

/// Streaming writer for one object.
///
/// The session is opened lazily on the first chunk that has to leave the
/// buffer, so an empty upload costs one session plus one commit request.
pub struct GcsWriter {
    client: GcsClient,
    bucket: String,
    name: String,
    session: Option<Url>,
    buffer: Vec<u8>,
    offset: u64,
}

impl GcsWriter {
    fn new(client: GcsClient, bucket: &str, name: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            name: name.to_string(),
            session: None,
            buffer: Vec::with_capacity(CHUNK_SIZE),
            offset: 0,
        }
    }

    async fn session(&mut self) -> Result<Url, StoreError> {
        if let Some(url) = &self.session {
            return Ok(url.clone());
        }
        let url = self.client.open_session(&self.bucket, &self.name).await?;
        self.session = Some(url.clone());
        Ok(url)
    }

    async fn send_chunk(&mut self, len: usize, total: Option<u64>) -> Result<(), StoreError> {
        let session = self.session().await?;
        let chunk: Vec<u8> = self.buffer.drain(..len).collect();
        let range = content_range(self.offset, len, total);
        tracing::debug!(name = %self.name, %range, "sending chunk");

        let resp = self
            .client
            .request(reqwest::Method::PUT, session.clone())
            .header(reqwest::header::CONTENT_RANGE, range)
            .body(chunk)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        match total {
            None if status == StatusCode::PERMANENT_REDIRECT => {
                let persisted = persisted_bytes(&resp);
                let expected = self.offset + len as u64;
                if persisted != Some(expected) {
                    return Err(StoreError::InvalidResponse(format!(
                        "store persisted {persisted:?} bytes, expected {expected}"
                    )));
                }
                self.offset = expected;
                Ok(())
            }
            Some(_) if status.is_success() => {
                self.offset += len as u64;
                Ok(())
            }
            _ => Err(status_error(resp, &session).await),
        }
    }
}

/// Upper bound + 1 of the `Range: bytes=0-N` header on a 308 response.
fn persisted_bytes(resp: &reqwest::Response) -> Option<u64> {
    let Some(range) = resp.headers().get(reqwest::header::RANGE) else {
        return Some(0);
    };
    let last = range.to_str().ok()?.strip_prefix("bytes=0-")?;
    last.parse::<u64>().ok().map(|n| n + 1)
}

#[async_trait]
impl ObjectWriter for GcsWriter {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StoreError> {
        self.buffer.extend_from_slice(chunk);
        while self.buffer.len() >= CHUNK_SIZE {
            self.send_chunk(CHUNK_SIZE, None).await?;
        }
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> Result<(), StoreError> {
        let len = self.buffer.len();
        let total = self.offset + len as u64;
        self.send_chunk(len, Some(total)).await?;
        tracing::debug!(bucket = %self.bucket, name = %self.name, bytes = total, "upload committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> GcsClient {
        GcsClient::new(
            Ambient {
                endpoint: endpoint.to_string(),
                credentials: Credentials::Anonymous,
            },
            REQUEST_TIMEOUT,
        )
        .unwrap()
    }

    #[test]
    fn chunk_size_is_multiple_of_256_kib() {
        assert_eq!(CHUNK_SIZE % (256 * 1024), 0);
    }

    #[test]
    fn upload_url_layout() {
        let url = client(DEFAULT_ENDPOINT).upload_url("my-bucket", "builds/42.zip");
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/upload/storage/v1/b/my-bucket/o?uploadType=resumable&name=builds%2F42.zip"
        );
    }

    #[test]
    fn object_url_encodes_slashes_in_name() {
        let url = client(DEFAULT_ENDPOINT).object_url("my-bucket", "builds/42.zip");
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/my-bucket/o/builds%2F42.zip"
        );
    }

    #[test]
    fn object_url_keeps_endpoint_path_prefix() {
        let url = client("http://localhost:4443/gcs/").object_url("b", "o.zip");
        assert_eq!(url.as_str(), "http://localhost:4443/gcs/storage/v1/b/b/o/o.zip");
    }

    #[test]
    fn rejects_non_base_endpoint() {
        let result = GcsClient::new(
            Ambient {
                endpoint: "mailto:ops@example.com".to_string(),
                credentials: Credentials::Anonymous,
            },
            REQUEST_TIMEOUT,
        );
        assert!(matches!(result, Err(StoreError::Settings(_))));
    }

    #[test]
    fn content_range_forms() {
        assert_eq!(content_range(0, 10, None), "bytes 0-9/*");
        assert_eq!(content_range(10, 5, Some(15)), "bytes 10-14/15");
        assert_eq!(content_range(8, 0, Some(8)), "bytes */8");
        assert_eq!(content_range(0, 0, Some(0)), "bytes */0");
    }

    #[test]
    fn parses_object_resource() {
        let body = r#"{
            "kind": "storage#object",
            "name": "build-42.zip",
            "bucket": "my-bucket",
            "size": "5",
            "md5Hash": "XUFAKrxLKna5cZ2REBfFkg==",
            "mediaLink": "https://storage.googleapis.com/download/storage/v1/b/my-bucket/o/build-42.zip?generation=1700000000000000&alt=media"
        }"#;
        let attrs = parse_object_resource(body).unwrap();
        assert_eq!(attrs.size, Some(5));
        assert_eq!(attrs.md5, Some(artipush_util::hash::md5_bytes(b"hello")));
        assert!(attrs.media_link.contains("generation="));
    }

    #[test]
    fn object_resource_without_media_link_is_invalid() {
        let err = parse_object_resource(r#"{"name": "x"}"#).unwrap_err();
        assert!(matches!(err, StoreError::InvalidResponse(_)));
    }

    #[test]
    fn redact_strips_session_token() {
        let url = Url::parse("https://storage.googleapis.com/upload?upload_id=secret").unwrap();
        assert_eq!(redact(&url), "https://storage.googleapis.com/upload");
    }
}
