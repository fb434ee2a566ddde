//! Default values for the mount lifecycle and the registry bootstrap.
//!
//! These only seed [`crate::config::MountSettings`] and
//! [`crate::config::RegfsConfig`]; nothing reads them as process-wide state.

/// Mount helper executable (SeaweedFS `weed` in `mount` mode).
pub const DEFAULT_MOUNT_HELPER: &str = "/usr/bin/weed mount";

/// Filesystem type reported by the mount table for a SeaweedFS FUSE mount.
pub const DEFAULT_FUSE_TYPE: &str = "fuse.seaweedfs";

/// Shell used to run every external command.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Command that prints the OS mount table.
pub const DEFAULT_MOUNT_LIST_COMMAND: &str = "mount";

/// Command used to detach a mount during teardown.
pub const DEFAULT_UNMOUNT_COMMAND: &str = "umount";

/// Number of mount-table polls before a mount is declared unconfirmed.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 3;

/// Delay before each mount-table poll, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Upper bound on a single mount-table listing, in milliseconds.
pub const DEFAULT_MOUNT_LIST_TIMEOUT_MS: u64 = 10_000;

/// Attempts made to create a uniquely named cache directory.
pub const CACHE_DIR_ATTEMPTS: u32 = 100;

/// Length of the random cache directory name.
pub const CACHE_DIR_NAME_LEN: usize = 10;

/// Backend selector accepted for SeaweedFS.
pub const BACKEND_TYPE_SWFS: &str = "swfs";

/// Local path the registry stores its data under.
pub const DEFAULT_MOUNT_PATH: &str = "/var/lib/registry";

/// Filer endpoint used when none is configured.
pub const DEFAULT_FILER: &str = "filer:8888";

/// Directory on the filer that backs the registry.
pub const DEFAULT_FILER_PATH: &str = "/registry";

/// Command line that starts the image registry.
pub const DEFAULT_REGISTRY_COMMAND: &str = "/entrypoint.sh /etc/docker/registry/config.yml";

