//! `regfs mount` — Mount storage and hold it until interrupted.

use std::process::ExitCode;

use anyhow::Context;
use clap::Args;
use regfs_common::config::RegfsConfig;
use regfs_storage::open_storage;

use crate::commands::ShutdownSignals;

/// Arguments for the `mount` command.
#[derive(Args, Debug)]
pub struct MountArgs {
    /// Leave the mount in place on exit instead of tearing it down.
    #[arg(long)]
    pub keep: bool,
}

/// Executes the `mount` command.
///
/// # Errors
///
/// Returns an error if storage cannot be mounted or torn down.
pub async fn execute(args: MountArgs, config: RegfsConfig) -> anyhow::Result<ExitCode> {
    let signals = ShutdownSignals::install()?;
    let storage = open_storage(&config.storage, config.settings)
        .await
        .context("storage initialization failed")?;
    tracing::info!(
        path = %storage.mount_path().display(),
        cache = %storage.cache_dir().display(),
        "storage mounted, waiting for SIGINT or SIGTERM"
    );

    signals.wait().await?;

    if args.keep {
        tracing::warn!(
            path = %storage.mount_path().display(),
            cache = %storage.cache_dir().display(),
            "leaving storage mounted"
        );
        return Ok(ExitCode::SUCCESS);
    }
    storage.teardown().await.context("storage teardown failed")?;
    Ok(ExitCode::SUCCESS)
}
