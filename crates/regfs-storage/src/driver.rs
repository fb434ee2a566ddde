//! Mount helper driver.
//!
//! Turns [`MountParameters`] into a single `weed mount` command line and
//! runs it. Preparing (validation, cache allocation, composition) is split
//! from launching so callers can fail fast before any process starts and
//! know the cache directory while the helper is still running.

use std::future::Future;
use std::path::{Path, PathBuf};

use regfs_common::config::{MountParameters, MountSettings};
use regfs_common::constants::CACHE_DIR_ATTEMPTS;
use regfs_common::error::{Result, StorageError};

use crate::cache_dir::allocate_cache_dir;
use crate::command::run_shell;

/// A validated helper invocation, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInvocation {
    /// Local mount path.
    pub target: PathBuf,
    /// Cache directory allocated for this mount.
    pub cache_dir: PathBuf,
    /// Full shell command line.
    pub command: String,
}

/// Establishes a mount by running an external helper.
pub trait MountDriver: Send + Sync + 'static {
    /// Validates the request, allocates a cache directory, and builds the
    /// helper command. Starts no process.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`], [`StorageError::TargetMissing`], or
    /// [`StorageError::CacheExhausted`].
    fn prepare(&self, target: &Path, params: &MountParameters) -> Result<MountInvocation>;

    /// Runs a prepared invocation until the helper exits.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Driver`] if the helper exits unsuccessfully.
    fn launch(&self, invocation: &MountInvocation) -> impl Future<Output = Result<()>> + Send;
}

/// Prepares and launches a mount, recording the cache directory in `params`.
///
/// # Errors
///
/// Returns any error from [`MountDriver::prepare`] or [`MountDriver::launch`].
pub async fn mount<D: MountDriver>(
    driver: &D,
    target: &Path,
    params: &mut MountParameters,
) -> Result<()> {
    let invocation = driver.prepare(target, params)?;
    params.cache_path = Some(invocation.cache_dir.clone());
    driver.launch(&invocation).await
}

/// Driver for SeaweedFS `weed mount`.
#[derive(Debug, Clone)]
pub struct SeaweedDriver {
    shell: PathBuf,
    helper: String,
    cache_root: PathBuf,
}

impl SeaweedDriver {
    /// Creates a driver using the helper, shell, and cache root from `settings`.
    #[must_use]
    pub fn new(settings: &MountSettings) -> Self {
        Self {
            shell: settings.shell.clone(),
            helper: settings.mount_helper.clone(),
            cache_root: settings.cache_root.clone(),
        }
    }
}

impl MountDriver for SeaweedDriver {
    fn prepare(&self, target: &Path, params: &MountParameters) -> Result<MountInvocation> {
        if params.cache_capacity < 0 {
            return Err(StorageError::Config {
                message: format!(
                    "cache capacity must not be negative, got {}",
                    params.cache_capacity
                ),
            });
        }
        if target.as_os_str().is_empty() {
            return Err(StorageError::TargetMissing);
        }

        let cache_dir =
            allocate_cache_dir(&self.cache_root).ok_or_else(|| StorageError::CacheExhausted {
                root: self.cache_root.clone(),
                attempts: CACHE_DIR_ATTEMPTS,
            })?;

        let command = compose_command(&self.helper, params, &cache_dir, target);
        Ok(MountInvocation {
            target: target.to_path_buf(),
            cache_dir,
            command,
        })
    }

    async fn launch(&self, invocation: &MountInvocation) -> Result<()> {
        tracing::info!(command = %invocation.command, "running mount helper");
        match run_shell(&self.shell, &invocation.command, None).await {
            Ok(output) => {
                tracing::info!(
                    mount_path = %invocation.target.display(),
                    output = output.trim(),
                    "mount helper exited"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(command = %invocation.command, error = %e, "mount helper failed");
                Err(StorageError::Driver { source: e })
            }
        }
    }
}

/// Builds the helper command line.
///
/// `-volumeServerAccess` and `-filer.path` are left out when empty.
#[must_use]
pub fn compose_command(
    helper: &str,
    params: &MountParameters,
    cache_dir: &Path,
    target: &Path,
) -> String {
    let mut command = format!(
        "{helper} -filer={} -cacheCapacityMB={} -cacheDir={}",
        params.filer,
        params.cache_capacity,
        cache_dir.display()
    );
    if !params.volume_server_access.is_empty() {
        command.push_str(" -volumeServerAccess=");
        command.push_str(&params.volume_server_access);
    }
    command.push_str(" -dir=");
    command.push_str(&target.to_string_lossy());
    if !params.filer_path.is_empty() {
        command.push_str(" -filer.path=");
        command.push_str(&params.filer_path);
    }
    command
}
