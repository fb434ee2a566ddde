//! CLI command definitions and dispatch.

pub mod check;
pub mod mount;
pub mod print_config;
pub mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use regfs_common::config::RegfsConfig;
use tokio::signal::unix::{Signal, SignalKind, signal};

/// regfs: FUSE-backed storage for an image registry.
#[derive(Parser, Debug)]
#[command(name = "regfs", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to a JSON configuration file.
    #[arg(long, global = true, env = "REGFS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "REGFS_LOG_JSON")]
    pub log_json: bool,

    /// Values overriding the configuration file.
    #[command(flatten)]
    pub overrides: Overrides,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Mount storage, run the registry, and tear storage down when it exits.
    Run(run::RunArgs),
    /// Mount storage and hold it until interrupted.
    Mount(mount::MountArgs),
    /// Check whether a path is listed in the mount table.
    Check(check::CheckArgs),
    /// Print the effective configuration as JSON.
    PrintConfig,
}

/// Command-line overrides for individual configuration values.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Filer endpoint (`host:port`).
    #[arg(long, global = true, env = "REGFS_FILER")]
    pub filer: Option<String>,

    /// Directory on the filer to mount.
    #[arg(long, global = true, env = "REGFS_FILER_PATH")]
    pub filer_path: Option<String>,

    /// Local mount path.
    #[arg(long, global = true, env = "REGFS_MOUNT_PATH")]
    pub mount_path: Option<PathBuf>,

    /// Local cache size in MiB.
    #[arg(
        long,
        global = true,
        env = "REGFS_CACHE_CAPACITY",
        allow_negative_numbers = true
    )]
    pub cache_capacity: Option<i64>,

    /// Volume server access mode passed to the mount helper.
    #[arg(long, global = true, env = "REGFS_VOLUME_SERVER_ACCESS")]
    pub volume_server_access: Option<String>,

    /// Mount helper command prefix.
    #[arg(long, global = true, env = "REGFS_MOUNT_HELPER")]
    pub mount_helper: Option<String>,
}

impl Overrides {
    /// Writes every override that was given into `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing `param` blob cannot be decoded.
    pub fn apply(self, config: &mut RegfsConfig) -> anyhow::Result<()> {
        let mut params = config
            .storage
            .mount_parameters()
            .context("invalid storage parameters")?;
        if let Some(filer) = self.filer {
            params.filer = filer;
        }
        if let Some(filer_path) = self.filer_path {
            params.filer_path = filer_path;
        }
        if let Some(capacity) = self.cache_capacity {
            params.cache_capacity = capacity;
        }
        if let Some(access) = self.volume_server_access {
            params.volume_server_access = access;
        }
        config.storage.param = serde_json::to_value(&params)?;

        if let Some(mount_path) = self.mount_path {
            config.storage.mount_path = mount_path;
        }
        if let Some(helper) = self.mount_helper {
            config.settings.mount_helper = helper;
        }
        Ok(())
    }
}

/// Loads the configuration file (or defaults) and applies overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(
    path: Option<&std::path::Path>,
    overrides: Overrides,
) -> anyhow::Result<RegfsConfig> {
    let mut config = match path {
        Some(path) => RegfsConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => RegfsConfig::default(),
    };
    overrides.apply(&mut config)?;
    Ok(config)
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(cli.config.as_deref(), cli.overrides)?;
    match cli.command {
        Command::Run(args) => run::execute(args, config).await,
        Command::Mount(args) => mount::execute(args, config).await,
        Command::Check(args) => check::execute(args, &config).await,
        Command::PrintConfig => print_config::execute(&config),
    }
}

/// SIGINT and SIGTERM listeners.
///
/// Installed before mounting; signals arriving after that are queued
/// until [`ShutdownSignals::wait`] is polled.
#[derive(Debug)]
pub struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignals {
    /// Installs the handlers.
    ///
    /// # Errors
    ///
    /// Returns an error if a signal handler cannot be installed.
    pub fn install() -> anyhow::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).context("failed to watch SIGINT")?,
            terminate: signal(SignalKind::terminate()).context("failed to watch SIGTERM")?,
        })
    }

    /// Resolves once SIGINT or SIGTERM has arrived since [`Self::install`].
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` matches the shutdown future expected by
    /// [`crate::registry::supervise`].
    pub async fn wait(mut self) -> anyhow::Result<()> {
        tokio::select! {
            _ = self.interrupt.recv() => tracing::info!("received SIGINT"),
            _ = self.terminate.recv() => tracing::info!("received SIGTERM"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use regfs_common::config::MountParameters;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_reach_parameters_and_settings() {
        let cli = Cli::try_parse_from([
            "regfs",
            "mount",
            "--filer",
            "seaweed:8888",
            "--cache-capacity",
            "1024",
            "--mount-path",
            "/srv/registry",
            "--mount-helper",
            "/opt/weed mount",
        ])
        .expect("parse");
        let config = load_config(None, cli.overrides).expect("config");

        let params = config.storage.mount_parameters().expect("params");
        assert_eq!(params.filer, "seaweed:8888");
        assert_eq!(params.cache_capacity, 1024);
        assert_eq!(params.filer_path, "/registry");
        assert_eq!(config.storage.mount_path, PathBuf::from("/srv/registry"));
        assert_eq!(config.settings.mount_helper, "/opt/weed mount");
    }

    #[test]
    fn negative_capacity_parses_and_is_left_to_the_driver() {
        let cli = Cli::try_parse_from(["regfs", "print-config", "--cache-capacity", "-1"])
            .expect("parse");
        let config = load_config(None, cli.overrides).expect("config");
        assert_eq!(
            config.storage.mount_parameters().expect("params").cache_capacity,
            -1
        );
    }

    #[test]
    fn config_file_is_merged_with_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("regfs.json");
        std::fs::write(
            &path,
            r#"{
                "storage": {
                    "type": "swfs",
                    "mountPath": "/var/lib/registry",
                    "param": {"filer": "a:8888", "filer_path": "/images", "cache_capacity": 64}
                },
                "registry": {"command": "registry serve /etc/registry.yml"}
            }"#,
        )
        .expect("write");

        let overrides = Overrides {
            filer: Some("b:8888".into()),
            ..Overrides::default()
        };
        let config = load_config(Some(&path), overrides).expect("config");
        assert_eq!(
            config.storage.mount_parameters().expect("params"),
            MountParameters {
                cache_capacity: 64,
                cache_path: None,
                filer: "b:8888".into(),
                filer_path: "/images".into(),
                volume_server_access: String::new(),
            }
        );
        assert_eq!(config.registry.command, "registry serve /etc/registry.yml");
    }

    #[tokio::test]
    async fn signal_during_startup_is_not_lost() {
        let signals = ShutdownSignals::install().expect("install");
        nix::sys::signal::raise(nix::sys::signal::Signal::SIGTERM).expect("raise");

        tokio::time::timeout(std::time::Duration::from_secs(5), signals.wait())
            .await
            .expect("queued signal delivered")
            .expect("wait");
    }

    #[test]
    fn unreadable_config_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_config(Some(&dir.path().join("missing.json")), Overrides::default())
            .expect_err("missing file");
        assert!(format!("{err:#}").contains("missing.json"));
    }
}
