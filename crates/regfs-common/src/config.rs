//! Configuration model for storage provisioning.
//!
//! [`StorageConfig`] is the inbound `{type, mountPath, param}` contract;
//! its `param` blob decodes into [`MountParameters`] for the FUSE backend.
//! [`MountSettings`] carries the knobs that shape the mount lifecycle
//! (helper path, filesystem type tag, poll policy) and is handed to the
//! orchestrator at construction time.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, StorageError};

/// Storage backend selected by [`StorageConfig::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// SeaweedFS mounted through `weed mount`.
    Swfs,
}

impl FromStr for BackendKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            constants::BACKEND_TYPE_SWFS | "seaweedfs" => Ok(Self::Swfs),
            other => Err(StorageError::Config {
                message: format!("unsupported storage type: {other:?}"),
            }),
        }
    }
}

/// Inbound storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend selector, e.g. `swfs`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Local path the backend is mounted at.
    #[serde(rename = "mountPath")]
    pub mount_path: PathBuf,
    /// Backend-specific parameters, decoded once the backend is known.
    #[serde(default)]
    pub param: serde_json::Value,
}

impl StorageConfig {
    /// Builds a SeaweedFS configuration from already-typed parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters cannot be serialized.
    pub fn swfs(mount_path: impl Into<PathBuf>, params: &MountParameters) -> Result<Self> {
        Ok(Self {
            kind: constants::BACKEND_TYPE_SWFS.into(),
            mount_path: mount_path.into(),
            param: serde_json::to_value(params)?,
        })
    }

    /// Parses the backend selector.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] for an empty or unknown type.
    pub fn backend(&self) -> Result<BackendKind> {
        self.kind.parse()
    }

    /// Decodes the `param` blob into FUSE mount parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob does not match [`MountParameters`].
    pub fn mount_parameters(&self) -> Result<MountParameters> {
        if self.param.is_null() {
            return Ok(MountParameters::default());
        }
        Ok(MountParameters::deserialize(&self.param)?)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: constants::BACKEND_TYPE_SWFS.into(),
            mount_path: PathBuf::from(constants::DEFAULT_MOUNT_PATH),
            param: serde_json::Value::Null,
        }
    }
}

/// Parameters of a SeaweedFS FUSE mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountParameters {
    /// Local cache size in MiB. Negative values are rejected.
    pub cache_capacity: i64,
    /// Cache directory chosen by the driver. Output only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
    /// Filer endpoint, `host:port`.
    pub filer: String,
    /// Directory on the filer to expose; empty means the filer root.
    pub filer_path: String,
    /// Volume server access mode; empty leaves the helper default.
    pub volume_server_access: String,
}

impl Default for MountParameters {
    fn default() -> Self {
        Self {
            cache_capacity: 0,
            cache_path: None,
            filer: constants::DEFAULT_FILER.into(),
            filer_path: constants::DEFAULT_FILER_PATH.into(),
            volume_server_access: String::new(),
        }
    }
}

/// Knobs of the mount lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountSettings {
    /// Mount helper command prefix; flags are appended to it.
    pub mount_helper: String,
    /// Filesystem type the mount table must report for the target.
    pub fuse_type: String,
    /// Shell every command runs under.
    pub shell: PathBuf,
    /// Command printing the mount table.
    pub mount_list_command: String,
    /// Command used to unmount; `-f` / `-l` are appended.
    pub unmount_command: String,
    /// Directory cache directories are created in.
    pub cache_root: PathBuf,
    /// Mount-table polls before giving up.
    pub poll_attempts: u32,
    /// Delay before each poll, in milliseconds.
    pub poll_interval_ms: u64,
    /// Deadline for one mount-table listing, in milliseconds.
    pub mount_list_timeout_ms: u64,
}

impl MountSettings {
    /// Delay before each poll.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Deadline for one mount-table listing.
    #[must_use]
    pub const fn mount_list_timeout(&self) -> Duration {
        Duration::from_millis(self.mount_list_timeout_ms)
    }
}

impl Default for MountSettings {
    fn default() -> Self {
        Self {
            mount_helper: constants::DEFAULT_MOUNT_HELPER.into(),
            fuse_type: constants::DEFAULT_FUSE_TYPE.into(),
            shell: PathBuf::from(constants::DEFAULT_SHELL),
            mount_list_command: constants::DEFAULT_MOUNT_LIST_COMMAND.into(),
            unmount_command: constants::DEFAULT_UNMOUNT_COMMAND.into(),
            cache_root: std::env::temp_dir(),
            poll_attempts: constants::DEFAULT_POLL_ATTEMPTS,
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            mount_list_timeout_ms: constants::DEFAULT_MOUNT_LIST_TIMEOUT_MS,
        }
    }
}

/// How the registry process is started once storage is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Shell command line starting the registry.
    pub command: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            command: constants::DEFAULT_REGISTRY_COMMAND.into(),
        }
    }
}

/// Root configuration file read by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegfsConfig {
    /// Backend selection and parameters.
    pub storage: StorageConfig,
    /// Mount lifecycle settings.
    pub settings: MountSettings,
    /// Registry launch settings.
    pub registry: RegistryConfig,
}

impl RegfsConfig {
    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| StorageError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_config_uses_wire_field_names() {
        let config: StorageConfig = serde_json::from_str(
            r#"{
                "type": "swfs",
                "mountPath": "/var/lib/registry",
                "param": {
                    "cache_capacity": 512,
                    "filer": "filer:8888",
                    "filer_path": "/registry",
                    "volume_server_access": "publicUrl"
                }
            }"#,
        )
        .expect("parse");
        assert_eq!(config.backend().expect("backend"), BackendKind::Swfs);
        assert_eq!(config.mount_path, PathBuf::from("/var/lib/registry"));

        let params = config.mount_parameters().expect("params");
        assert_eq!(params.cache_capacity, 512);
        assert_eq!(params.filer, "filer:8888");
        assert_eq!(params.filer_path, "/registry");
        assert_eq!(params.volume_server_access, "publicUrl");
        assert!(params.cache_path.is_none());
    }

    #[test]
    fn unknown_or_empty_backend_is_rejected() {
        for kind in ["", "nfs"] {
            let config = StorageConfig {
                kind: kind.into(),
                ..StorageConfig::default()
            };
            assert!(matches!(config.backend(), Err(StorageError::Config { .. })));
        }
    }

    #[test]
    fn seaweedfs_alias_selects_swfs() {
        assert_eq!("seaweedfs".parse::<BackendKind>().expect("kind"), BackendKind::Swfs);
    }

    #[test]
    fn missing_param_falls_back_to_defaults() {
        let config: StorageConfig =
            serde_json::from_str(r#"{"type": "swfs", "mountPath": "/data"}"#).expect("parse");
        assert_eq!(
            config.mount_parameters().expect("params"),
            MountParameters::default()
        );
    }

    #[test]
    fn swfs_constructor_round_trips_parameters() {
        let params = MountParameters {
            cache_capacity: 64,
            filer: "seaweed-filer:8888".into(),
            ..MountParameters::default()
        };
        let config = StorageConfig::swfs("/mnt/registry", &params).expect("config");
        assert_eq!(config.kind, "swfs");
        assert_eq!(config.mount_parameters().expect("params"), params);
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = RegfsConfig::from_json("{}").expect("parse");
        assert_eq!(config.storage.mount_path, PathBuf::from("/var/lib/registry"));
        assert_eq!(config.settings.poll_attempts, 3);
        assert_eq!(config.settings.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.settings.mount_list_timeout(), Duration::from_secs(10));
        assert_eq!(config.settings.fuse_type, "fuse.seaweedfs");
        assert_eq!(
            config.registry.command,
            "/entrypoint.sh /etc/docker/registry/config.yml"
        );
    }

    #[test]
    fn partial_settings_keep_other_defaults() {
        let config = RegfsConfig::from_json(
            r#"{"settings": {"mount_helper": "/opt/weed mount", "poll_interval_ms": 50}}"#,
        )
        .expect("parse");
        assert_eq!(config.settings.mount_helper, "/opt/weed mount");
        assert_eq!(config.settings.poll_interval_ms, 50);
        assert_eq!(config.settings.unmount_command, "umount");
    }

    #[test]
    fn load_reports_missing_file_path() {
        let dir = std::env::temp_dir().join("regfs-config-that-does-not-exist.json");
        match RegfsConfig::load(&dir) {
            Err(StorageError::Io { path, .. }) => assert_eq!(path, dir),
            other => panic!("expected I/O error, got {other:?}"),
        }
    }
}
