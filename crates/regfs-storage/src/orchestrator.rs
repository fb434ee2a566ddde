//! Mount orchestration.
//!
//! A mount attempt runs two tasks: the driver task launches the helper,
//! and the poll task watches the mount table. Only the poll task publishes
//! the verdict, through a single-slot channel. The helper often stays
//! resident for the life of the mount, so the driver task is never awaited
//! by the caller; whatever it eventually returns goes to the log.
//!
//! Worst case, a broken backend is reported after `poll_attempts *
//! poll_interval` (1.5 s with the defaults).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use regfs_common::config::{MountParameters, MountSettings};
use regfs_common::error::{Result, StorageError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::driver::MountDriver;
use crate::handle::{StorageHandle, remove_cache_dir};
use crate::mount_table::{MountTable, is_mounted};

/// Outcome of one mount attempt.
#[derive(Debug)]
pub enum MountVerdict {
    /// The mount table listed the target with the expected type.
    Succeeded,
    /// Polling gave up while the helper was still running or had exited cleanly.
    TimedOut,
    /// Polling gave up and the helper had already failed.
    DriverFailed(StorageError),
}

/// Runs a [`MountDriver`] against a [`MountTable`] and decides whether the
/// mount came up.
#[derive(Debug)]
pub struct MountOrchestrator<D, T> {
    driver: Arc<D>,
    table: Arc<T>,
    settings: MountSettings,
}

impl<D: MountDriver, T: MountTable> MountOrchestrator<D, T> {
    /// Creates an orchestrator with its collaborators and lifecycle settings.
    pub fn new(driver: D, table: T, settings: MountSettings) -> Self {
        Self {
            driver: Arc::new(driver),
            table: Arc::new(table),
            settings,
        }
    }

    /// Mounts `params` at `target` and waits until the mount table confirms it.
    ///
    /// Parameter validation and cache allocation happen before any task is
    /// started. The returned handle owns the cache directory.
    ///
    /// # Errors
    ///
    /// Returns the driver's preparation error ([`StorageError::Config`],
    /// [`StorageError::TargetMissing`], [`StorageError::CacheExhausted`]) or
    /// [`StorageError::MountNotConfirmed`] if no poll saw the mount. The
    /// latter carries the helper's error when the helper had already failed.
    pub async fn establish(
        &self,
        target: &Path,
        mut params: MountParameters,
    ) -> Result<StorageHandle> {
        let invocation = self.driver.prepare(target, &params)?;
        let cache_dir = invocation.cache_dir.clone();
        params.cache_path = Some(cache_dir.clone());

        tracing::info!(
            path = %target.display(),
            cache = %cache_dir.display(),
            filer = %params.filer,
            "mounting storage"
        );

        let driver = Arc::clone(&self.driver);
        let driver_task = tokio::spawn(async move { driver.launch(&invocation).await });

        let (verdict_tx, verdict_rx) = oneshot::channel();
        let table = Arc::clone(&self.table);
        let path = target.to_path_buf();
        let fs_type = self.settings.fuse_type.clone();
        let attempts = self.settings.poll_attempts;
        let interval = self.settings.poll_interval();
        drop(tokio::spawn(async move {
            let confirmed = poll_mount_table(&*table, &path, &fs_type, attempts, interval).await;
            let _ = verdict_tx.send(confirmed);
        }));

        let confirmed = verdict_rx.await.unwrap_or(false);
        match reconcile(confirmed, driver_task).await {
            MountVerdict::Succeeded => {
                tracing::info!(path = %target.display(), "storage mounted");
                Ok(StorageHandle::new(
                    target.to_path_buf(),
                    cache_dir,
                    params,
                    &self.settings,
                ))
            }
            verdict => {
                tracing::error!(
                    path = %target.display(),
                    cache = %cache_dir.display(),
                    ?verdict,
                    "mount not confirmed"
                );
                let driver = match verdict {
                    MountVerdict::DriverFailed(e) => {
                        // the helper has exited
                        if let Err(err) = remove_cache_dir(&cache_dir).await {
                            tracing::warn!(
                                cache = %cache_dir.display(),
                                error = %err,
                                "failed to remove cache of failed mount"
                            );
                        }
                        Some(Box::new(e))
                    }
                    _ => None,
                };
                Err(StorageError::MountNotConfirmed {
                    path: target.to_path_buf(),
                    fs_type: self.settings.fuse_type.clone(),
                    attempts,
                    driver,
                })
            }
        }
    }
}

/// Polls up to `attempts` times, sleeping `interval` before each poll.
async fn poll_mount_table<T: MountTable>(
    table: &T,
    path: &Path,
    fs_type: &str,
    attempts: u32,
    interval: Duration,
) -> bool {
    for attempt in 1..=attempts {
        tokio::time::sleep(interval).await;
        if is_mounted(table, path, fs_type).await {
            tracing::debug!(path = %path.display(), attempt, "mount listed");
            return true;
        }
        tracing::debug!(path = %path.display(), attempt, "mount not listed yet");
    }
    false
}

/// Combines the poll result with whatever the driver task has done so far.
///
/// Never waits on a driver task that is still running.
async fn reconcile(confirmed: bool, driver_task: JoinHandle<Result<()>>) -> MountVerdict {
    if confirmed {
        log_driver_outcome(driver_task);
        return MountVerdict::Succeeded;
    }
    if !driver_task.is_finished() {
        log_driver_outcome(driver_task);
        return MountVerdict::TimedOut;
    }
    match driver_task.await {
        Ok(Ok(())) => MountVerdict::TimedOut,
        Ok(Err(e)) => MountVerdict::DriverFailed(e),
        Err(e) => {
            tracing::error!(error = %e, "mount driver task aborted");
            MountVerdict::TimedOut
        }
    }
}

/// Sends the driver task's eventual result to the log.
fn log_driver_outcome(driver_task: JoinHandle<Result<()>>) {
    drop(tokio::spawn(async move {
        match driver_task.await {
            Ok(Ok(())) => tracing::info!("background mount helper exited"),
            Ok(Err(e)) => tracing::error!(error = %e, "background mount helper failed"),
            Err(e) => tracing::error!(error = %e, "mount driver task aborted"),
        }
    }));
}
