//! Handle to a confirmed mount.

use std::io;
use std::path::{Path, PathBuf};

use regfs_common::config::{MountParameters, MountSettings};
use regfs_common::error::{CommandError, Result, TeardownError};

use crate::command::run_shell;

/// A filesystem mounted at [`Self::mount_path`], backed by [`Self::cache_dir`].
///
/// Only [`crate::MountOrchestrator`] creates handles, and only after the
/// mount table listed the path. [`Self::teardown`] consumes the handle; a
/// new mount needs a new handle.
#[derive(Debug)]
pub struct StorageHandle {
    mount_path: PathBuf,
    cache_dir: PathBuf,
    params: MountParameters,
    shell: PathBuf,
    unmount_command: String,
}

impl StorageHandle {
    pub(crate) fn new(
        mount_path: PathBuf,
        cache_dir: PathBuf,
        params: MountParameters,
        settings: &MountSettings,
    ) -> Self {
        Self {
            mount_path,
            cache_dir,
            params,
            shell: settings.shell.clone(),
            unmount_command: settings.unmount_command.clone(),
        }
    }

    /// Path the filesystem is mounted at.
    #[must_use]
    pub fn mount_path(&self) -> &Path {
        &self.mount_path
    }

    /// Local cache directory owned by this mount.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Parameters the mount was made with, including the recorded cache path.
    #[must_use]
    pub const fn parameters(&self) -> &MountParameters {
        &self.params
    }

    /// Unmounts the filesystem and removes the cache directory.
    ///
    /// Cache removal runs even when unmounting fails. A cache directory that
    /// is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`regfs_common::error::StorageError::Teardown`] listing the
    /// forced-unmount failure, the cache-removal failure, or both.
    pub async fn teardown(self) -> Result<()> {
        let unmount = self.unmount().await.err();
        let cleanup = remove_cache_dir(&self.cache_dir)
            .await
            .err()
            .map(|e| (self.cache_dir.clone(), e));

        if unmount.is_none() && cleanup.is_none() {
            tracing::info!(path = %self.mount_path.display(), "storage torn down");
            return Ok(());
        }
        Err(TeardownError {
            mount_path: self.mount_path,
            unmount,
            cleanup,
        }
        .into())
    }

    /// Force-unmounts, falling back to a lazy unmount whose result is only
    /// logged. The forced attempt's error is what gets returned.
    async fn unmount(&self) -> std::result::Result<(), CommandError> {
        let path = self.mount_path.display();
        let forced = format!("{} -f {path}", self.unmount_command);
        match run_shell(&self.shell, &forced, None).await {
            Ok(output) => {
                tracing::info!(path = %path, output = output.trim(), "unmounted");
                Ok(())
            }
            Err(e) => {
                tracing::error!(path = %path, error = %e, "forced unmount failed");
                let lazy = format!("{} -l {path}", self.unmount_command);
                match run_shell(&self.shell, &lazy, None).await {
                    Ok(_) => tracing::info!(path = %path, "lazily detached"),
                    Err(lazy_err) => {
                        tracing::warn!(path = %path, error = %lazy_err, "lazy unmount failed");
                    }
                }
                Err(e)
            }
        }
    }
}

/// Removes `path` recursively if it exists.
///
/// A `stat` failure other than "not found" still attempts the removal.
pub(crate) async fn remove_cache_dir(path: &Path) -> io::Result<()> {
    if let Err(e) = tokio::fs::metadata(path).await {
        if e.kind() == io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), "cache directory already gone");
            return Ok(());
        }
    }
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            tracing::info!(path = %path.display(), "cache directory removed");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to remove cache directory");
            Err(e)
        }
    }
}
