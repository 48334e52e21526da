//! Object-store protocol: write an object by `(bucket, name)` as a stream,
//! commit it by finishing the stream, then read back its attributes.
//!
//! Two backends implement the seam: Google Cloud Storage over its JSON API
//! ([`gcs`]) and a directory tree on the local filesystem ([`local`]).

pub mod auth;
pub mod connect;
pub mod error;
pub mod gcs;
pub mod local;

use async_trait::async_trait;

pub use error::StoreError;

/// Metadata of a committed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectAttrs {
    /// Direct-access link; may carry transient query parameters.
    pub media_link: String,
    pub size: Option<u64>,
    pub md5: Option<[u8; 16]>,
}

/// Builds a store client from ambient settings and credentials.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ObjectStore>, StoreError>;
}

/// A bucket-addressed object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open a write stream for `name` in `bucket`. Nothing is visible until
    /// [`ObjectWriter::finish`] succeeds.
    async fn writer(&self, bucket: &str, name: &str) -> Result<Box<dyn ObjectWriter>, StoreError>;

    async fn attrs(&self, bucket: &str, name: &str) -> Result<ObjectAttrs, StoreError>;
}

/// Write half of a single object upload.
#[async_trait]
pub trait ObjectWriter: Send {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StoreError>;

    /// Flush buffered data and commit the object.
    async fn finish(self: Box<Self>) -> Result<(), StoreError>;
}
