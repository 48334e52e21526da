use miette::Result;

use artipush_core::config::StoreBackend;
use artipush_util::progress::{status, status_warn};

use crate::cli::TargetArgs;

pub fn exec(target: TargetArgs) -> Result<()> {
    let (_, loaded) = super::load_config(target)?;
    let config = loaded.project.registry.validate()?;

    match &loaded.file {
        Some(path) => status("Loaded", &path.display().to_string()),
        None => status("Loaded", "configuration from flags"),
    }
    status(
        "Valid",
        &format!(
            "{} -> {}/{}",
            config.source(),
            config.bucket(),
            config.name()
        ),
    );
    if loaded.project.store.backend == StoreBackend::Local && loaded.project.store.root.is_none() {
        status_warn("Warning", "local backend has no root directory");
    }
    Ok(())
}
