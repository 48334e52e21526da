//! Filesystem-backed object store: `<root>/<bucket>/<name>`.
//!
//! Used for air-gapped pipelines and for exercising the publish flow without
//! a cloud account. Objects are written to a part file and renamed into place
//! on commit, so a reader never sees a half-written object.

use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::StoreError;
use crate::{ObjectAttrs, ObjectStore, ObjectWriter};

const PART_SUFFIX: &str = ".artipush-part";

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        artipush_util::fs::ensure_dir(root)?;
        let root = std::fs::canonicalize(root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an object is stored at. Rejects names escaping the bucket.
    pub fn object_path(&self, bucket: &str, name: &str) -> Result<PathBuf, StoreError> {
        check_relative(bucket)?;
        check_relative(name)?;
        Ok(self.root.join(bucket).join(name))
    }
}

fn check_relative(part: &str) -> Result<(), StoreError> {
    let path = Path::new(part);
    let plain = path
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if part.is_empty() || !plain {
        return Err(StoreError::InvalidObjectName(part.to_string()));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn writer(&self, bucket: &str, name: &str) -> Result<Box<dyn ObjectWriter>, StoreError> {
        let dest = self.object_path(bucket, name)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut part = dest.clone().into_os_string();
        part.push(PART_SUFFIX);
        let part = PathBuf::from(part);
        let file = tokio::fs::File::create(&part).await?;
        Ok(Box::new(LocalWriter {
            file,
            part,
            dest,
            committed: false,
        }))
    }

    async fn attrs(&self, bucket: &str, name: &str) -> Result<ObjectAttrs, StoreError> {
        let path = self.object_path(bucket, name)?;
        let meta = tokio::fs::metadata(&path).await?;
        let generation = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        let md5_path = path.clone();
        let md5 = tokio::task::spawn_blocking(move || artipush_util::hash::md5_file(&md5_path))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

        let mut link = Url::from_file_path(&path).map_err(|()| {
            StoreError::InvalidResponse(format!("{} is not an absolute path", path.display()))
        })?;
        link.query_pairs_mut()
            .append_pair("generation", &generation.to_string());

        Ok(ObjectAttrs {
            media_link: link.to_string(),
            size: Some(meta.len()),
            md5: Some(md5),
        })
    }
}

struct LocalWriter {
    file: tokio::fs::File,
    part: PathBuf,
    dest: PathBuf,
    committed: bool,
}

impl Drop for LocalWriter {
    fn drop(&mut self) {
        // An abandoned part file is not an object; the destination is untouched.
        if !self.committed {
            let _ = std::fs::remove_file(&self.part);
        }
    }
}

#[async_trait]
impl ObjectWriter for LocalWriter {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StoreError> {
        self.file.write_all(chunk).await?;
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> Result<(), StoreError> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        tokio::fs::rename(&self.part, &self.dest).await?;
        self.committed = true;
        tracing::debug!(path = %self.dest.display(), "object committed");
        Ok(())
    }
}
