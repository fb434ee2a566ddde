//! Backend selection.

use regfs_common::config::{BackendKind, MountSettings, StorageConfig};
use regfs_common::error::Result;

use crate::driver::SeaweedDriver;
use crate::handle::StorageHandle;
use crate::mount_table::SystemMountTable;
use crate::orchestrator::MountOrchestrator;

/// Mounts the backend described by `config` and returns its handle.
///
/// # Errors
///
/// Returns an error if the backend type is unsupported, its parameters do
/// not decode, or the mount cannot be established.
pub async fn open_storage(
    config: &StorageConfig,
    settings: MountSettings,
) -> Result<StorageHandle> {
    match config.backend()? {
        BackendKind::Swfs => {
            let params = config.mount_parameters()?;
            let orchestrator = MountOrchestrator::new(
                SeaweedDriver::new(&settings),
                SystemMountTable::new(&settings),
                settings,
            );
            orchestrator.establish(&config.mount_path, params).await
        }
    }
}

#[cfg(test)]
mod tests {
    use regfs_common::error::StorageError;

    use super::*;

    #[tokio::test]
    async fn unsupported_type_is_a_config_error() {
        let config = StorageConfig {
            kind: "s3".into(),
            ..StorageConfig::default()
        };
        let err = open_storage(&config, MountSettings::default())
            .await
            .expect_err("unsupported");
        assert!(matches!(err, StorageError::Config { .. }));
    }

    #[tokio::test]
    async fn malformed_param_blob_is_rejected() {
        let config = parse_storage(
            r#"{"type": "swfs", "mountPath": "/var/lib/registry", "param": {"cache_capacity": "lots"}}"#,
        );
        let err = open_storage(&config, MountSettings::default())
            .await
            .expect_err("bad param");
        assert!(matches!(err, StorageError::Serialization { .. }));
    }

    fn parse_storage(text: &str) -> StorageConfig {
        regfs_common::config::RegfsConfig::from_json(&format!(r#"{{"storage": {text}}}"#))
            .expect("config")
            .storage
    }
}
