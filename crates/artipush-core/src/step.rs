//! The capability a host pipeline depends on.

use async_trait::async_trait;

use artipush_util::context::OpContext;
use artipush_util::errors::PublishError;
use artipush_util::progress::StatusReporter;

use crate::artifact::Artifact;
use crate::config::RegistryConfig;
use crate::docs::Documentation;
use crate::source::SourceLocation;

/// Values the host injects into a single push.
pub struct PushInputs<'a> {
    pub ctx: OpContext,
    pub source: SourceLocation,
    pub ui: &'a dyn StatusReporter,
}

/// A pipeline step that publishes one build artifact.
///
/// Hosts bind configuration once with [`PublishStep::configure`], then call
/// [`PublishStep::push`] per run; they never reach into the implementation.
#[async_trait]
pub trait PublishStep: Send + Sync {
    /// Validate and bind configuration. Fails on any empty required field.
    fn configure(config: RegistryConfig) -> Result<Self, PublishError>
    where
        Self: Sized;

    fn documentation() -> Documentation
    where
        Self: Sized;

    /// Upload the configured artifact and return its canonical reference.
    async fn push(&self, inputs: PushInputs<'_>) -> Result<Artifact, PublishError>;
}
