//! `regfs run` — Mount storage, run the registry, tear storage down.

use std::process::ExitCode;

use anyhow::Context;
use clap::Args;
use regfs_common::config::RegfsConfig;
use regfs_storage::open_storage;

use crate::commands::ShutdownSignals;
use crate::registry::{self, RegistryExit};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Registry command line. Defaults to the configured registry command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub registry: Vec<String>,
}

/// Executes the `run` command.
///
/// Storage failures abort before the registry starts. Storage is torn down
/// however the registry ends.
///
/// # Errors
///
/// Returns an error if storage cannot be mounted, the registry cannot be
/// started, or teardown fails.
pub async fn execute(args: RunArgs, config: RegfsConfig) -> anyhow::Result<ExitCode> {
    let signals = ShutdownSignals::install()?;
    let storage = open_storage(&config.storage, config.settings.clone())
        .await
        .context("storage initialization failed")?;
    tracing::info!(
        path = %storage.mount_path().display(),
        cache = %storage.cache_dir().display(),
        "storage ready"
    );

    let command = if args.registry.is_empty() {
        config.registry.command
    } else {
        args.registry.join(" ")
    };
    let exit = registry::supervise(&config.settings.shell, &command, signals.wait()).await;

    let teardown = storage.teardown().await;

    let code = match exit {
        Ok(RegistryExit::Exited(status)) if status.success() => ExitCode::SUCCESS,
        Ok(RegistryExit::Stopped(status)) => {
            tracing::info!(%status, "registry stopped on request");
            ExitCode::SUCCESS
        }
        Ok(RegistryExit::Exited(status)) => {
            tracing::error!(%status, "registry failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            if let Err(t) = teardown {
                tracing::error!(error = %t, "storage teardown failed");
            }
            return Err(e);
        }
    };
    teardown.context("storage teardown failed")?;
    Ok(code)
}
