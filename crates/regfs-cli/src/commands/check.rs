//! `regfs check` — Query the mount table once.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use regfs_common::config::RegfsConfig;
use regfs_storage::mount_table::{SystemMountTable, is_mounted};

/// Arguments for the `check` command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to look for. Defaults to the configured mount path.
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Filesystem type to expect. Defaults to the configured FUSE type.
    #[arg(long)]
    pub fs_type: Option<String>,
}

/// Executes the `check` command. Exits 0 when mounted, 1 otherwise.
///
/// # Errors
///
/// Never fails; a failed listing reports "not mounted".
#[allow(clippy::print_stdout)]
pub async fn execute(args: CheckArgs, config: &RegfsConfig) -> anyhow::Result<ExitCode> {
    let path = args.path.unwrap_or_else(|| config.storage.mount_path.clone());
    let fs_type = args
        .fs_type
        .unwrap_or_else(|| config.settings.fuse_type.clone());

    let table = SystemMountTable::new(&config.settings);
    if is_mounted(&table, &path, &fs_type).await {
        println!("{} is mounted ({fs_type})", path.display());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{} is not mounted ({fs_type})", path.display());
        Ok(ExitCode::FAILURE)
    }
}
