//! Registry process supervision.
//!
//! The registry runs in the foreground with inherited stdio. A shutdown
//! signal is forwarded to it as SIGTERM, and it is killed if it has not
//! exited after [`STOP_GRACE`].

use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

use anyhow::Context;
use tokio::process::{Child, Command};

/// Time the registry gets to exit after SIGTERM.
pub const STOP_GRACE: Duration = Duration::from_secs(10);

/// How the registry stopped.
#[derive(Debug)]
pub enum RegistryExit {
    /// The registry exited by itself.
    Exited(ExitStatus),
    /// A shutdown signal arrived and the registry was stopped.
    Stopped(ExitStatus),
}

/// Starts the registry and waits until it exits or `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the registry cannot be started or waited on.
pub async fn supervise<F>(
    shell: &Path,
    command: &str,
    shutdown: F,
) -> anyhow::Result<RegistryExit>
where
    F: Future<Output = anyhow::Result<()>>,
{
    tracing::info!(command, "starting registry");
    let mut child = Command::new(shell)
        .arg("-c")
        .arg(command)
        .spawn()
        .with_context(|| format!("failed to start registry: {command}"))?;

    tokio::select! {
        status = child.wait() => {
            let status = status.context("failed to wait for registry")?;
            tracing::info!(%status, "registry exited");
            Ok(RegistryExit::Exited(status))
        }
        signalled = shutdown => {
            signalled?;
            let status = stop(&mut child).await?;
            tracing::info!(%status, "registry stopped");
            Ok(RegistryExit::Stopped(status))
        }
    }
}

/// Sends SIGTERM, then SIGKILL once [`STOP_GRACE`] passes.
async fn stop(child: &mut Child) -> anyhow::Result<ExitStatus> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
        if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
            tracing::warn!(pid, error = %e, "failed to signal registry");
        }
    }

    if let Ok(status) = tokio::time::timeout(STOP_GRACE, child.wait()).await {
        return status.context("failed to wait for registry");
    }
    tracing::warn!(grace = ?STOP_GRACE, "registry ignored SIGTERM, killing it");
    child.kill().await.context("failed to kill registry")?;
    child.wait().await.context("failed to wait for registry")
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    const SH: &str = "/bin/sh";

    #[tokio::test]
    async fn exit_status_is_reported() {
        let exit = supervise(Path::new(SH), "exit 3", std::future::pending())
            .await
            .expect("supervise");
        match exit {
            RegistryExit::Exited(status) => assert_eq!(status.code(), Some(3)),
            other => panic!("expected Exited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shutdown_stops_a_running_registry() {
        let shutdown = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        };
        let start = Instant::now();
        let exit = supervise(Path::new(SH), "exec sleep 30", shutdown)
            .await
            .expect("supervise");
        assert!(matches!(exit, RegistryExit::Stopped(_)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn missing_shell_fails_to_start() {
        let err = supervise(Path::new("/nonexistent/sh"), "true", std::future::pending())
            .await
            .expect_err("spawn");
        assert!(err.to_string().contains("failed to start registry"));
    }
}
