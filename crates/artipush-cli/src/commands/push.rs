use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use miette::Result;
use tokio_util::sync::CancellationToken;

use artipush_core::source::SourceLocation;
use artipush_core::step::{PublishStep, PushInputs};
use artipush_ops::Publisher;
use artipush_store::connect::ConfiguredConnector;
use artipush_util::context::OpContext;
use artipush_util::errors::PublishError;
use artipush_util::progress::{status, TerminalStatus};

use crate::cli::TargetArgs;

pub async fn exec(
    target: TargetArgs,
    source_dir: Option<PathBuf>,
    timeout: Option<u64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let (cwd, loaded) = super::load_config(target)?;

    let publisher = Publisher::configure(loaded.project.registry)?
        .with_connector(Arc::new(ConfiguredConnector::new(loaded.project.store)));
    let source = SourceLocation::new(match source_dir {
        Some(dir) => cwd.join(dir),
        None => loaded.base_dir,
    });

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, aborting push");
            interrupt.cancel();
        }
    });
    let mut ctx = OpContext::with_token(token);
    if let Some(secs) = timeout {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    let ui = TerminalStatus::new();
    let artifact = publisher
        .push(PushInputs {
            ctx,
            source,
            ui: &ui,
        })
        .await?;

    let json = artifact.to_json()?;
    match output {
        Some(path) => {
            let path = cwd.join(path);
            std::fs::write(&path, format!("{json}\n")).map_err(PublishError::Io)?;
            status("Wrote", &path.display().to_string());
        }
        None => println!("{json}"),
    }
    Ok(())
}
