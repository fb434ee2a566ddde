//! Unified error types for the regfs workspace.
//!
//! [`StorageError`] covers the whole mount lifecycle. External command
//! failures are described by [`CommandError`] and teardown failures by
//! [`TeardownError`], both of which nest inside it.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single shell command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The shell could not be started or waited on.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        /// Command line that was being run.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully.
    #[error("`{command}` failed ({status}): {output}")]
    Failed {
        /// Command line that was run.
        command: String,
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// Captured stdout followed by stderr, for diagnostics.
        output: String,
    },

    /// The command outlived its deadline and its process group was killed.
    #[error("`{command}` exceeded its deadline of {timeout:?}")]
    TimedOut {
        /// Command line that was run.
        command: String,
        /// Deadline that was exceeded.
        timeout: Duration,
    },
}

impl CommandError {
    /// Returns the command line this error refers to.
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::Spawn { command, .. }
            | Self::Failed { command, .. }
            | Self::TimedOut { command, .. } => command,
        }
    }

    /// Returns whether the command was cut short by its deadline.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Every step of a teardown that failed.
///
/// Both steps always run, so both failures are kept.
#[derive(Debug)]
pub struct TeardownError {
    /// Mount path that was being torn down.
    pub mount_path: PathBuf,
    /// Error from the forced unmount, if it failed.
    pub unmount: Option<CommandError>,
    /// Cache directory and the error hit while removing it, if any.
    pub cleanup: Option<(PathBuf, std::io::Error)>,
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "teardown of {} failed", self.mount_path.display())?;
        if let Some(err) = &self.unmount {
            write!(f, "; unmount: {err}")?;
        }
        if let Some((path, err)) = &self.cleanup {
            write!(f, "; removing cache {}: {err}", path.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for TeardownError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Some(err) = &self.unmount {
            return Some(err);
        }
        self.cleanup
            .as_ref()
            .map(|(_, err)| err as &(dyn std::error::Error + 'static))
    }
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A configuration value is invalid. Never retried.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// No mount target path was given.
    #[error("mount target path is missing")]
    TargetMissing,

    /// No cache directory could be created.
    #[error("could not create a cache directory under {} after {attempts} attempts", .root.display())]
    CacheExhausted {
        /// Directory the cache was to be created in.
        root: PathBuf,
        /// Number of attempts made.
        attempts: u32,
    },

    /// The mount helper exited unsuccessfully.
    #[error("mount helper failed: {source}")]
    Driver {
        /// Failure carrying the helper command line and its output.
        source: CommandError,
    },

    /// The mount never appeared in the mount table.
    #[error("mount not confirmed: {} not listed as {fs_type} after {attempts} polls", .path.display())]
    MountNotConfirmed {
        /// Mount path that was polled for.
        path: PathBuf,
        /// Filesystem type that was expected.
        fs_type: String,
        /// Number of polls made.
        attempts: u32,
        /// Helper failure, when the helper had already exited with an error.
        #[source]
        driver: Option<Box<StorageError>>,
    },

    /// An auxiliary command failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Unmounting or cache removal failed.
    #[error(transparent)]
    Teardown(#[from] TeardownError),

    /// An I/O operation failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_unmount() -> CommandError {
        use std::os::unix::process::ExitStatusExt;

        CommandError::Failed {
            command: "umount -f /var/lib/registry".into(),
            status: ExitStatus::from_raw(32 << 8),
            output: "not mounted".into(),
        }
    }

    #[test]
    fn teardown_error_lists_both_failures() {
        let err = TeardownError {
            mount_path: PathBuf::from("/var/lib/registry"),
            unmount: Some(failed_unmount()),
            cleanup: Some((
                PathBuf::from("/tmp/abcdefghij"),
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            )),
        };
        let text = err.to_string();
        assert!(text.contains("unmount"));
        assert!(text.contains("not mounted"));
        assert!(text.contains("/tmp/abcdefghij"));
    }

    #[test]
    fn teardown_error_source_prefers_unmount() {
        let err = TeardownError {
            mount_path: PathBuf::from("/mnt"),
            unmount: Some(failed_unmount()),
            cleanup: None,
        };
        let source = std::error::Error::source(&err).expect("source");
        assert!(source.to_string().contains("umount -f"));
    }

    #[test]
    fn command_error_reports_timeout() {
        let err = CommandError::TimedOut {
            command: "mount".into(),
            timeout: Duration::from_secs(10),
        };
        assert!(err.is_timeout());
        assert_eq!(err.command(), "mount");
        assert!(!failed_unmount().is_timeout());
    }

    #[test]
    fn mount_not_confirmed_chains_driver_error() {
        let err = StorageError::MountNotConfirmed {
            path: PathBuf::from("/var/lib/registry"),
            fs_type: "fuse.seaweedfs".into(),
            attempts: 3,
            driver: Some(Box::new(StorageError::Driver {
                source: failed_unmount(),
            })),
        };
        assert!(err.to_string().starts_with("mount not confirmed"));
        let source = std::error::Error::source(&err).expect("driver source");
        assert!(source.to_string().starts_with("mount helper failed"));
    }
}
