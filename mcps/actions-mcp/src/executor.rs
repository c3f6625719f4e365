//! Sandboxed command execution
//!
//! Spawns the rendered argument vector directly, never through a shell, with
//! the project-bounded working directory and the startup environment
//! snapshot. The timeout is a hard wall-clock bound; on expiry the child and
//! its whole process group are killed and whatever output was captured is
//! returned with `timed_out: true`.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::env::EnvSnapshot;
use crate::sanitize::sanitize_output;
use crate::types::{ActionOutput, ExecError};

/// Run `argv` with a wall-clock timeout, capturing sanitized output
///
/// A non-zero exit status is ordinary result data. The returned future is
/// cancellation-safe: the child has `kill_on_drop` set, so dropping this
/// future (e.g. when the caller cancels the request) cannot leak a process.
pub async fn run_command(
    argv: &[String],
    cwd: &Path,
    env: &EnvSnapshot,
    timeout_secs: u64,
) -> Result<ActionOutput, ExecError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(ExecError::SpawnFailed {
            command: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "empty argument vector"),
        });
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .env_clear()
        .envs(env.iter())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group, so the timeout can take grandchildren down too.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|e| ExecError::SpawnFailed {
        command: program.clone(),
        source: e,
    })?;
    let pid = child.id();

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();

    // Read both streams while waiting, so a timeout still has the partial
    // output the child produced before being killed.
    let wait = tokio::time::timeout(Duration::from_secs(timeout_secs), async {
        if let (Some(mut out), Some(mut err)) = (stdout, stderr) {
            let _ = tokio::join!(out.read_to_end(&mut out_buf), err.read_to_end(&mut err_buf));
        }
        child.wait().await
    })
    .await;

    match wait {
        Ok(Ok(status)) => Ok(ActionOutput {
            exit_code: status.code(),
            stdout: sanitize_output(&String::from_utf8_lossy(&out_buf)),
            stderr: sanitize_output(&String::from_utf8_lossy(&err_buf)),
            timed_out: false,
        }),
        Ok(Err(e)) => Err(ExecError::Io(e)),
        Err(_elapsed) => {
            kill_process_group(pid);
            let _ = child.kill().await;

            Ok(ActionOutput {
                exit_code: None,
                stdout: sanitize_output(&String::from_utf8_lossy(&out_buf)),
                stderr: sanitize_output(&String::from_utf8_lossy(&err_buf)),
                timed_out: true,
            })
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = pid {
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    /// Minimal environment: spawning uses `env_clear`, so PATH has to come
    /// from the snapshot for bare program names to resolve.
    fn test_env() -> EnvSnapshot {
        EnvSnapshot::from_pairs([("PATH", std::env::var("PATH").unwrap_or_default())])
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_command(
            &argv(&["echo", "hello world"]),
            dir.path(),
            &test_env(),
            5,
        )
        .await
        .unwrap();

        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout.trim(), "hello world");
        assert!(!output.timed_out);
    }

    #[tokio::test]
    async fn metacharacters_reach_the_child_as_one_inert_argument() {
        let dir = tempfile::tempdir().unwrap();
        let canary = dir.path().join("pwned");
        let payload = format!("; touch {}", canary.display());

        let output = run_command(
            &argv(&["echo", &payload]),
            dir.path(),
            &test_env(),
            5,
        )
        .await
        .unwrap();

        // The payload is echoed literally and no secondary command ran.
        assert_eq!(output.exit_code, Some(0));
        assert!(output.stdout.contains("; touch"));
        assert!(!canary.exists());
    }

    #[tokio::test]
    async fn nonzero_exit_code_is_data_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_command(&argv(&["false"]), dir.path(), &test_env(), 5)
            .await
            .unwrap();
        assert_eq!(output.exit_code, Some(1));
        assert!(!output.timed_out);
    }

    #[tokio::test]
    async fn timeout_kills_the_child_and_reports_timed_out() {
        let dir = tempfile::tempdir().unwrap();
        let start = std::time::Instant::now();
        let output = run_command(
            &argv(&["sleep", "5"]),
            dir.path(),
            &test_env(),
            1,
        )
        .await
        .unwrap();

        assert_eq!(output.exit_code, None);
        assert!(output.timed_out);
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_failed() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_command(
            &argv(&["definitely-not-a-real-binary-12345"]),
            dir.path(),
            &test_env(),
            5,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecError::SpawnFailed { .. }));
    }

    #[tokio::test]
    async fn child_sees_the_snapshot_environment() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvSnapshot::from_pairs([
            ("PATH", std::env::var("PATH").unwrap_or_default()),
            ("ACTIONS_MCP_MARKER", "present".to_string()),
        ]);

        let output = run_command(&argv(&["env"]), dir.path(), &env, 5)
            .await
            .unwrap();
        assert!(output.stdout.contains("ACTIONS_MCP_MARKER=present"));
    }

    #[tokio::test]
    async fn output_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_command(
            &argv(&["printf", "\\033[31mFAIL \\033[0m\\007"]),
            dir.path(),
            &test_env(),
            5,
        )
        .await
        .unwrap();
        assert_eq!(output.stdout, "FAIL ");
    }
}
