//! Shell command execution.
//!
//! Every external program (mount helper, `mount`, `umount`) goes through
//! [`run_shell`]. Commands run in their own process group so a deadline can
//! take down the whole tree, not just the shell. No retries happen here.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use regfs_common::error::CommandError;
use tokio::process::Command;

/// Runs `command` under `shell -c` and returns its standard output.
///
/// With a `deadline`, the process group is killed once it elapses and
/// [`CommandError::TimedOut`] is returned. Without one the call waits for
/// as long as the command runs. The output is returned as produced; callers
/// must not assume it is sanitized.
///
/// # Errors
///
/// Returns [`CommandError::Spawn`] if the shell cannot be run,
/// [`CommandError::Failed`] on a non-zero exit (with stdout and stderr
/// captured), or [`CommandError::TimedOut`] when the deadline passes.
pub async fn run_shell(
    shell: &Path,
    command: &str,
    deadline: Option<Duration>,
) -> Result<String, CommandError> {
    tracing::debug!(command, ?deadline, "running command");

    let mut cmd = Command::new(shell);
    let _ = cmd
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(deadline.is_some());

    let child = cmd.spawn().map_err(|e| CommandError::Spawn {
        command: command.to_owned(),
        source: e,
    })?;
    let pid = child.id();

    let waited = match deadline {
        None => child.wait_with_output().await,
        Some(limit) => {
            if let Ok(waited) = tokio::time::timeout(limit, child.wait_with_output()).await {
                waited
            } else {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                tracing::warn!(command, timeout = ?limit, "command deadline exceeded");
                return Err(CommandError::TimedOut {
                    command: command.to_owned(),
                    timeout: limit,
                });
            }
        }
    };

    let output = waited.map_err(|e| CommandError::Spawn {
        command: command.to_owned(),
        source: e,
    })?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
    captured.push_str(&String::from_utf8_lossy(&output.stderr));
    Err(CommandError::Failed {
        command: command.to_owned(),
        status: output.status,
        output: captured.trim().to_owned(),
    })
}

/// Sends `SIGKILL` to the process group led by `pid`.
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pid, error = %e, "failed to kill process group"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    const SH: &str = "/bin/sh";

    #[tokio::test]
    async fn returns_stdout_on_success() {
        let out = run_shell(Path::new(SH), "echo hello", None)
            .await
            .expect("echo");
        assert_eq!(out, "hello\n");
    }

    #[tokio::test]
    async fn failure_captures_status_and_output() {
        let err = run_shell(Path::new(SH), "echo partial; echo broken >&2; exit 3", None)
            .await
            .expect_err("non-zero exit");
        match err {
            CommandError::Failed {
                command,
                status,
                output,
            } => {
                assert!(command.contains("exit 3"));
                assert_eq!(status.code(), Some(3));
                assert!(output.contains("partial"));
                assert!(output.contains("broken"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn deadline_is_distinguished_from_failure() {
        let start = Instant::now();
        let err = run_shell(Path::new(SH), "sleep 5", Some(Duration::from_millis(200)))
            .await
            .expect_err("deadline");
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn deadline_kills_background_children() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("survived");
        let command = format!("(sleep 1; touch {}) & wait", marker.display());
        let err = run_shell(Path::new(SH), &command, Some(Duration::from_millis(100)))
            .await
            .expect_err("deadline");
        assert!(err.is_timeout());
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn fast_command_beats_deadline() {
        let out = run_shell(Path::new(SH), "printf ok", Some(Duration::from_secs(5)))
            .await
            .expect("printf");
        assert_eq!(out, "ok");
    }

    #[tokio::test]
    async fn missing_shell_is_a_spawn_error() {
        let err = run_shell(Path::new("/nonexistent/sh"), "true", None)
            .await
            .expect_err("spawn");
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
