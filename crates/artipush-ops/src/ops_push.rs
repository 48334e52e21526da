//! Operation: publish one build artifact to an object store.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use url::Url;

use artipush_core::artifact::Artifact;
use artipush_core::config::{RegistryConfig, ValidatedConfig};
use artipush_core::docs::{registry_documentation, Documentation};
use artipush_core::step::{PublishStep, PushInputs};
use artipush_store::connect::ConfiguredConnector;
use artipush_store::{ObjectAttrs, StoreConnector};
use artipush_util::context::OpContext;
use artipush_util::errors::{PublishError, PushStage};
use artipush_util::hash::{to_hex, StreamDigest};
use artipush_util::progress::{StatusLevel, StatusScope};

const COPY_BUFFER: usize = 256 * 1024;

/// Stages a push moves through, in order. None is entered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PushState {
    Init,
    ClientReady,
    ObjectOpened,
    SourceOpened,
    Uploaded,
    Finalized,
    AttrsFetched,
    UrlResolved,
    Done,
}

struct Tracker {
    state: PushState,
}

impl Tracker {
    fn advance(&mut self, next: PushState) {
        debug_assert!(next > self.state, "push state went from {:?} to {next:?}", self.state);
        tracing::debug!(from = ?self.state, to = ?next, "push advanced");
        self.state = next;
    }

    /// Report a failure on the status sink and hand the error back.
    fn fail(&self, status: &StatusScope<'_>, label: &str, err: PublishError) -> PublishError {
        status.step(StatusLevel::Error, label);
        tracing::warn!(state = ?self.state, stage = ?err.stage(), "push failed: {err}");
        err
    }
}

/// Publishes the configured artifact; one instance serves any number of pushes.
pub struct Publisher {
    config: ValidatedConfig,
    connector: Arc<dyn StoreConnector>,
}

impl Publisher {
    pub fn new(config: ValidatedConfig, connector: Arc<dyn StoreConnector>) -> Self {
        Self { config, connector }
    }

    /// Swap the store connector, e.g. for the local backend.
    pub fn with_connector(mut self, connector: Arc<dyn StoreConnector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }
}

/// Await `fut` under `ctx`, folding interruption and failure into one message.
async fn guarded<T, E, F>(ctx: &OpContext, fut: F) -> Result<T, String>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match ctx.run(fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(interrupted) => Err(interrupted.to_string()),
    }
}

#[async_trait]
impl PublishStep for Publisher {
    fn configure(config: RegistryConfig) -> Result<Self, PublishError> {
        let connector: Arc<dyn StoreConnector> = Arc::new(ConfiguredConnector::default());
        Ok(Self::new(config.validate()?, connector))
    }

    fn documentation() -> Documentation {
        registry_documentation()
    }

    async fn push(&self, inputs: PushInputs<'_>) -> Result<Artifact, PublishError> {
        let PushInputs { ctx, source, ui } = inputs;
        let bucket = self.config.bucket();
        let name = self.config.name();

        let status = StatusScope::open(ui);
        let mut tracker = Tracker {
            state: PushState::Init,
        };
        status.update(&format!("Pushing artifact to registry: {name}"));

        let store = guarded(&ctx, self.connector.connect())
            .await
            .map_err(|message| PublishError::ClientInit { message })?;
        tracker.advance(PushState::ClientReady);

        let mut writer = match guarded(&ctx, store.writer(bucket, name)).await {
            Ok(writer) => writer,
            Err(message) => {
                let err = PublishError::Upload {
                    stage: PushStage::ObjectOpen,
                    message,
                };
                return Err(tracker.fail(&status, "Opening object writer failed", err));
            }
        };
        tracker.advance(PushState::ObjectOpened);

        let path = source.resolve(self.config.source());
        let mut file = match guarded(&ctx, tokio::fs::File::open(&path)).await {
            Ok(file) => file,
            Err(message) => {
                let err = PublishError::LocalFile { path, message };
                return Err(tracker.fail(&status, "Opening source file failed", err));
            }
        };
        tracker.advance(PushState::SourceOpened);
        tracing::debug!(path = %path.display(), %bucket, %name, "uploading");

        let mut digest = StreamDigest::new();
        let mut buffer = vec![0u8; COPY_BUFFER];
        loop {
            let read = guarded(&ctx, file.read(&mut buffer)).await;
            let copied = match read {
                Ok(0) => break,
                Ok(n) => guarded(&ctx, writer.write(&buffer[..n])).await.map(|()| n),
                Err(message) => Err(message),
            };
            match copied {
                Ok(n) => digest.update(&buffer[..n]),
                Err(message) => {
                    let err = PublishError::Upload {
                        stage: PushStage::Upload,
                        message,
                    };
                    return Err(tracker.fail(&status, "Uploading file to object storage failed", err));
                }
            }
        }
        drop(file);
        tracker.advance(PushState::Uploaded);

        if let Err(message) = guarded(&ctx, writer.finish()).await {
            let err = PublishError::Commit { message };
            return Err(tracker.fail(&status, "Error closing writer after upload", err));
        }
        tracker.advance(PushState::Finalized);

        let attrs = match guarded(&ctx, store.attrs(bucket, name)).await {
            Ok(attrs) => attrs,
            Err(message) => {
                let err = PublishError::Metadata { message };
                return Err(tracker.fail(
                    &status,
                    "Error fetching uploaded object attributes",
                    err,
                ));
            }
        };
        tracker.advance(PushState::AttrsFetched);
        check_integrity(&attrs, digest);

        let source_url = match strip_query_params(&attrs.media_link) {
            Ok(url) => url,
            Err(e) => {
                let err = PublishError::UrlParse {
                    url: attrs.media_link.clone(),
                    message: e.to_string(),
                };
                return Err(tracker.fail(&status, "Error parsing uploaded object url", err));
            }
        };
        tracker.advance(PushState::UrlResolved);

        status.step(
            StatusLevel::Ok,
            &format!("Artifact saved to object storage: '{source_url}'"),
        );
        tracker.advance(PushState::Done);
        Ok(Artifact::new(source_url))
    }
}

/// Compare what the store reports with what was streamed.
///
/// Mismatches are logged only; the push result is unchanged.
fn check_integrity(attrs: &ObjectAttrs, digest: StreamDigest) {
    let sent = digest.len();
    if let Some(size) = attrs.size {
        if size != sent {
            tracing::warn!(reported = size, sent, "stored object size differs from source");
        }
    }
    let local = digest.finish();
    if let Some(remote) = attrs.md5 {
        if remote != local {
            tracing::warn!(
                reported = %to_hex(&remote),
                sent = %to_hex(&local),
                "stored object MD5 differs from source"
            );
        }
    }
}

/// Remove the query component of `raw`, leaving every other byte as given.
///
/// Fails only if `raw` is not a valid absolute URL.
pub fn strip_query_params(raw: &str) -> Result<String, url::ParseError> {
    let raw = raw.trim();
    let parsed = Url::parse(raw)?;
    if parsed.query().is_none() {
        return Ok(raw.to_string());
    }
    let query_start = raw.find('?').unwrap_or(raw.len());
    let fragment = raw[query_start..]
        .find('#')
        .map_or("", |i| &raw[query_start + i..]);
    Ok(format!("{}{fragment}", &raw[..query_start]))
}
