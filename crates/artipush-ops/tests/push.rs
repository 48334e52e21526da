use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use artipush_core::config::{RegistryConfig, StoreBackend, StoreConfig};
use artipush_core::source::SourceLocation;
use artipush_core::step::{PublishStep, PushInputs};
use artipush_ops::Publisher;
use artipush_store::connect::ConfiguredConnector;
use artipush_store::{ObjectAttrs, ObjectStore, ObjectWriter, StoreConnector, StoreError};
use artipush_util::context::OpContext;
use artipush_util::errors::{PublishError, PushStage};
use artipush_util::hash::md5_bytes;
use artipush_util::progress::{StatusLevel, StatusReporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    None,
    Connect,
    Open,
    Write,
    HangWrite,
    Finish,
    Attrs,
    BadLink,
}

type Objects = Arc<Mutex<HashMap<(String, String), Vec<u8>>>>;
type Calls = Arc<Mutex<Vec<&'static str>>>;

#[derive(Clone)]
struct FakeStore {
    objects: Objects,
    calls: Calls,
    fault: Fault,
}

impl FakeStore {
    fn new(fault: Fault) -> Self {
        Self {
            objects: Arc::default(),
            calls: Arc::default(),
            fault,
        }
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn called(&self, call: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| *c == call)
    }

    fn object(&self, bucket: &str, name: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
    }
}

fn failure(what: &str) -> StoreError {
    StoreError::InvalidResponse(format!("injected {what} failure"))
}

#[async_trait]
impl StoreConnector for FakeStore {
    async fn connect(&self) -> Result<Box<dyn ObjectStore>, StoreError> {
        self.record("connect");
        if self.fault == Fault::Connect {
            return Err(StoreError::Credentials("none in test".to_string()));
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn writer(&self, bucket: &str, name: &str) -> Result<Box<dyn ObjectWriter>, StoreError> {
        self.record("writer");
        if self.fault == Fault::Open {
            return Err(failure("open"));
        }
        Ok(Box::new(FakeWriter {
            store: self.clone(),
            key: (bucket.to_string(), name.to_string()),
            data: Vec::new(),
        }))
    }

    async fn attrs(&self, bucket: &str, name: &str) -> Result<ObjectAttrs, StoreError> {
        self.record("attrs");
        if self.fault == Fault::Attrs {
            return Err(failure("attrs"));
        }
        let data = self
            .object(bucket, name)
            .ok_or_else(|| StoreError::InvalidResponse("no such object".to_string()))?;
        let media_link = if self.fault == Fault::BadLink {
            "not a url".to_string()
        } else {
            format!("https://storage.example.test/{bucket}/{name}?generation=7&alt=media")
        };
        Ok(ObjectAttrs {
            media_link,
            size: Some(data.len() as u64),
            md5: Some(md5_bytes(&data)),
        })
    }
}

struct FakeWriter {
    store: FakeStore,
    key: (String, String),
    data: Vec<u8>,
}

#[async_trait]
impl ObjectWriter for FakeWriter {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StoreError> {
        self.store.record("write");
        match self.store.fault {
            Fault::Write => return Err(failure("write")),
            Fault::HangWrite => std::future::pending::<()>().await,
            _ => {}
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<(), StoreError> {
        self.store.record("finish");
        if self.store.fault == Fault::Finish {
            return Err(failure("finish"));
        }
        let FakeWriter { store, key, data } = *self;
        store.objects.lock().unwrap().insert(key, data);
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<(String, String)>>,
}

impl Recorder {
    fn events(&self) -> Vec<(String, String)> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, kind: &str) -> usize {
        self.events().iter().filter(|(k, _)| k == kind).count()
    }
}

impl StatusReporter for Recorder {
    fn update(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(("update".to_string(), message.to_string()));
    }

    fn step(&self, level: StatusLevel, message: &str) {
        let kind = match level {
            StatusLevel::Ok => "ok",
            StatusLevel::Warning => "warning",
            StatusLevel::Error => "error",
        };
        self.events
            .lock()
            .unwrap()
            .push((kind.to_string(), message.to_string()));
    }

    fn close(&self) {
        self.events
            .lock()
            .unwrap()
            .push(("close".to_string(), String::new()));
    }
}

fn publisher(store: &FakeStore) -> Publisher {
    Publisher::configure(RegistryConfig::new("server.zip", "build-42.zip", "my-bucket"))
        .unwrap()
        .with_connector(Arc::new(store.clone()))
}

fn build_dir(content: &[u8]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("server.zip"), content).unwrap();
    tmp
}

async fn push(
    publisher: &Publisher,
    dir: &TempDir,
    ctx: OpContext,
    ui: &Recorder,
) -> Result<artipush_core::artifact::Artifact, PublishError> {
    publisher
        .push(PushInputs {
            ctx,
            source: SourceLocation::new(dir.path()),
            ui,
        })
        .await
}

#[tokio::test]
async fn test_push_uploads_and_returns_clean_url() {
    let store = FakeStore::new(Fault::None);
    let dir = build_dir(b"X");
    let ui = Recorder::default();

    let artifact = push(&publisher(&store), &dir, OpContext::new(), &ui)
        .await
        .unwrap();

    assert_eq!(
        artifact.source_url,
        "https://storage.example.test/my-bucket/build-42.zip"
    );
    assert!(!artifact.source_url.contains('?'));
    assert_eq!(store.object("my-bucket", "build-42.zip"), Some(b"X".to_vec()));

    let events = ui.events();
    assert_eq!(
        events.first(),
        Some(&(
            "update".to_string(),
            "Pushing artifact to registry: build-42.zip".to_string()
        ))
    );
    assert_eq!(ui.count("ok"), 1);
    assert_eq!(ui.count("error"), 0);
    assert!(events[events.len() - 2].1.contains(&artifact.source_url));
    assert_eq!(ui.count("close"), 1);
    assert_eq!(events.last().unwrap().0, "close");
}

#[tokio::test]
async fn test_push_preserves_large_file_bytes() {
    let content: Vec<u8> = (0..(1024 * 1024 + 3)).map(|i| (i % 251) as u8).collect();
    let store = FakeStore::new(Fault::None);
    let dir = build_dir(&content);
    let ui = Recorder::default();

    push(&publisher(&store), &dir, OpContext::new(), &ui)
        .await
        .unwrap();

    assert_eq!(store.object("my-bucket", "build-42.zip"), Some(content));
}

#[tokio::test]
async fn test_push_empty_file() {
    let store = FakeStore::new(Fault::None);
    let dir = build_dir(b"");
    let ui = Recorder::default();

    push(&publisher(&store), &dir, OpContext::new(), &ui)
        .await
        .unwrap();

    assert_eq!(store.object("my-bucket", "build-42.zip"), Some(Vec::new()));
    assert!(!store.called("write"));
}

#[tokio::test]
async fn test_missing_source_fails_before_commit() {
    let store = FakeStore::new(Fault::None);
    let dir = TempDir::new().unwrap();
    let ui = Recorder::default();

    let err = push(&publisher(&store), &dir, OpContext::new(), &ui)
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::LocalFile { .. }), "got {err:?}");
    assert_eq!(err.stage(), Some(PushStage::SourceOpen));
    assert!(!store.called("finish"));
    assert!(!store.called("attrs"));
    assert!(ui
        .events()
        .contains(&("error".to_string(), "Opening source file failed".to_string())));
    assert_eq!(ui.count("close"), 1);
}

#[tokio::test]
async fn test_each_failing_step_is_reported_once() {
    let cases = [
        (Fault::Open, PushStage::ObjectOpen, "Opening object writer failed"),
        (Fault::Write, PushStage::Upload, "Uploading file to object storage failed"),
        (Fault::Finish, PushStage::Commit, "Error closing writer after upload"),
        (Fault::Attrs, PushStage::Metadata, "Error fetching uploaded object attributes"),
        (Fault::BadLink, PushStage::UrlParse, "Error parsing uploaded object url"),
    ];

    for (fault, stage, label) in cases {
        let store = FakeStore::new(fault);
        let dir = build_dir(b"payload");
        let ui = Recorder::default();

        let err = push(&publisher(&store), &dir, OpContext::new(), &ui)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(stage), "fault {fault:?}: {err}");
        assert_eq!(ui.count("error"), 1, "fault {fault:?}");
        assert_eq!(ui.count("ok"), 0, "fault {fault:?}");
        assert_eq!(ui.count("close"), 1, "fault {fault:?}");
        assert!(
            ui.events().contains(&("error".to_string(), label.to_string())),
            "fault {fault:?}: {:?}",
            ui.events()
        );
    }
}

#[tokio::test]
async fn test_metadata_failure_after_successful_upload() {
    let store = FakeStore::new(Fault::Attrs);
    let dir = build_dir(b"payload");
    let ui = Recorder::default();

    let err = push(&publisher(&store), &dir, OpContext::new(), &ui)
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Metadata { .. }));
    assert_eq!(
        store.object("my-bucket", "build-42.zip"),
        Some(b"payload".to_vec())
    );
}

#[tokio::test]
async fn test_client_init_failure_has_no_error_step() {
    let store = FakeStore::new(Fault::Connect);
    let dir = build_dir(b"payload");
    let ui = Recorder::default();

    let err = push(&publisher(&store), &dir, OpContext::new(), &ui)
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::ClientInit { .. }));
    assert!(!store.called("writer"));
    assert_eq!(ui.count("error"), 0);
    assert_eq!(ui.count("close"), 1);
}

#[tokio::test]
async fn test_cancelled_context_aborts_before_connect() {
    let store = FakeStore::new(Fault::None);
    let dir = build_dir(b"payload");
    let ui = Recorder::default();
    let ctx = OpContext::new();
    ctx.cancel();

    let err = push(&publisher(&store), &dir, ctx, &ui).await.unwrap_err();

    assert_eq!(err.stage(), Some(PushStage::ClientInit));
    assert!(err.to_string().contains("cancelled"), "got {err}");
    assert!(!store.called("connect"));
    assert_eq!(ui.count("close"), 1);
}

#[tokio::test]
async fn test_cancel_during_upload_aborts_without_commit() {
    let store = FakeStore::new(Fault::HangWrite);
    let dir = build_dir(b"payload");
    let ui = Recorder::default();
    let ctx = OpContext::new();

    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = push(&publisher(&store), &dir, ctx, &ui).await.unwrap_err();

    assert_eq!(err.stage(), Some(PushStage::Upload));
    assert!(err.to_string().contains("cancelled"), "got {err}");
    assert!(!store.called("finish"));
    assert_eq!(store.object("my-bucket", "build-42.zip"), None);
    assert_eq!(ui.count("close"), 1);
}

#[tokio::test]
async fn test_deadline_during_upload_aborts() {
    let store = FakeStore::new(Fault::HangWrite);
    let dir = build_dir(b"payload");
    let ui = Recorder::default();
    let ctx = OpContext::new().with_timeout(Duration::from_millis(100));

    let err = push(&publisher(&store), &dir, ctx, &ui).await.unwrap_err();

    assert_eq!(err.stage(), Some(PushStage::Upload));
    assert!(err.to_string().contains("deadline exceeded"), "got {err}");
    assert!(!store.called("finish"));
}

#[tokio::test]
async fn test_configure_rejects_empty_bucket() {
    let result = Publisher::configure(RegistryConfig::new("server.zip", "build-42.zip", ""));
    assert!(matches!(result, Err(PublishError::Config { .. })));
}

#[tokio::test]
async fn test_concurrent_pushes_share_no_state() {
    let store = FakeStore::new(Fault::None);
    let first = Publisher::configure(RegistryConfig::new("a.bin", "a.bin", "bucket"))
        .unwrap()
        .with_connector(Arc::new(store.clone()));
    let second = Publisher::configure(RegistryConfig::new("b.bin", "b.bin", "bucket"))
        .unwrap()
        .with_connector(Arc::new(store.clone()));

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.bin"), b"first").unwrap();
    std::fs::write(dir.path().join("b.bin"), b"second").unwrap();
    let (ui_a, ui_b) = (Recorder::default(), Recorder::default());

    let (a, b) = tokio::join!(
        push(&first, &dir, OpContext::new(), &ui_a),
        push(&second, &dir, OpContext::new(), &ui_b),
    );

    assert!(a.unwrap().source_url.ends_with("/bucket/a.bin"));
    assert!(b.unwrap().source_url.ends_with("/bucket/b.bin"));
    assert_eq!(store.object("bucket", "a.bin"), Some(b"first".to_vec()));
    assert_eq!(store.object("bucket", "b.bin"), Some(b"second".to_vec()));
    assert_eq!(ui_a.count("close"), 1);
    assert_eq!(ui_b.count("close"), 1);
}

#[tokio::test]
async fn test_push_to_local_backend() {
    let dir = build_dir(b"X");
    let root = TempDir::new().unwrap();
    let connector = ConfiguredConnector::new(StoreConfig {
        backend: StoreBackend::Local,
        root: Some(root.path().to_path_buf()),
        ..Default::default()
    });
    let publisher = Publisher::configure(RegistryConfig::new("server.zip", "build-42.zip", "my-bucket"))
        .unwrap()
        .with_connector(Arc::new(connector));
    let ui = Recorder::default();

    let artifact = push(&publisher, &dir, OpContext::new(), &ui).await.unwrap();

    assert!(artifact.source_url.starts_with("file://"));
    assert!(artifact.source_url.ends_with("/my-bucket/build-42.zip"));
    assert!(!artifact.source_url.contains('?'));
    let stored = std::fs::read(root.path().join("my-bucket").join("build-42.zip")).unwrap();
    assert_eq!(stored, b"X");
}
