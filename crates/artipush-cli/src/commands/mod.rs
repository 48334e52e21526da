//! Command dispatch and handler modules.

mod docs;
mod push;
mod validate;

use std::path::PathBuf;

use miette::Result;

use artipush_core::config::RegistryOverrides;
use artipush_ops::ops_config::{self, LoadedConfig, StoreOverrides};
use artipush_util::errors::PublishError;

use crate::cli::{Cli, Command, TargetArgs};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Push {
            target,
            source_dir,
            timeout,
            output,
        } => push::exec(target, source_dir, timeout, output).await,
        Command::Validate { target } => validate::exec(target),
        Command::Docs { json } => docs::exec(json),
    }
}

/// Load the config file and apply the flags in `target` on top of it.
fn load_config(target: TargetArgs) -> Result<(PathBuf, LoadedConfig)> {
    let cwd = std::env::current_dir().map_err(PublishError::Io)?;
    let registry = RegistryOverrides {
        source: target.source,
        name: target.name,
        bucket: target.bucket,
    };
    let store = StoreOverrides {
        backend: target.backend,
        endpoint: target.endpoint,
        root: target.root,
        timeout_secs: target.request_timeout,
    };
    let loaded = ops_config::load(&cwd, target.config.as_deref(), registry, store)?;
    Ok((cwd, loaded))
}
