//! OS mount table lookups.
//!
//! The check is a substring match on the text printed by `mount`
//! (`<source> on <path> type <fstype> (<options>)`), not a structured
//! parse. It is tied to that output format: a path containing spaces, or
//! a platform printing a different layout, will not match.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regfs_common::config::MountSettings;
use regfs_common::error::Result;

use crate::command::run_shell;

/// Source of the raw mount table text.
pub trait MountTable: Send + Sync + 'static {
    /// Returns the current mount table as printed by the OS.
    fn list_mounts(&self) -> impl Future<Output = Result<String>> + Send;
}

/// Mount table read by running the system listing command.
#[derive(Debug, Clone)]
pub struct SystemMountTable {
    shell: PathBuf,
    command: String,
    timeout: Duration,
}

impl SystemMountTable {
    /// Creates a reader using the listing command and deadline from `settings`.
    #[must_use]
    pub fn new(settings: &MountSettings) -> Self {
        Self {
            shell: settings.shell.clone(),
            command: settings.mount_list_command.clone(),
            timeout: settings.mount_list_timeout(),
        }
    }
}

impl MountTable for SystemMountTable {
    async fn list_mounts(&self) -> Result<String> {
        Ok(run_shell(&self.shell, &self.command, Some(self.timeout)).await?)
    }
}

/// Returns whether `path` is currently mounted with type `fs_type`.
///
/// A failed or timed-out listing counts as "not mounted".
pub async fn is_mounted<T: MountTable>(table: &T, path: &Path, fs_type: &str) -> bool {
    match table.list_mounts().await {
        Ok(text) => contains_mount(&text, path, fs_type),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to list mounts");
            false
        }
    }
}

/// Searches mount table text for `on <path> type <fs_type>`.
///
/// One trailing `/` is stripped from `path` first, except for `/` itself.
#[must_use]
pub fn contains_mount(table_text: &str, path: &Path, fs_type: &str) -> bool {
    let raw = path.to_string_lossy();
    let path = match raw.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => raw.as_ref(),
    };
    table_text.contains(&format!("on {path} type {fs_type}"))
}
