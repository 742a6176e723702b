use anyhow::{Context, Result};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// Run a command and return the result regardless of exit code.
pub fn run_cmd_unchecked(cmd: &str, args: &[&str]) -> Result<ExecResult> {
    let start = Instant::now();
    let output = Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to execute {cmd}"))?;
    let duration = start.elapsed();

    Ok(ExecResult {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration,
    })
}

/// Run a command asynchronously and return an error if it exits non-zero.
///
/// The child is killed if `timeout` elapses or `cancel` fires first.
pub async fn run_cmd(
    cmd: &str,
    args: &[&str],
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ExecResult> {
    let start = Instant::now();
    let child = tokio::process::Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to execute {cmd}"))?;

    // Dropping the output future drops the child, which kills it.
    let output = tokio::select! {
        res = tokio::time::timeout(timeout, child.wait_with_output()) => match res {
            Ok(output) => output.with_context(|| format!("failed to wait for {cmd}"))?,
            Err(_) => anyhow::bail!(
                "{} {} timed out after {}s",
                cmd,
                args.join(" "),
                timeout.as_secs()
            ),
        },
        _ = cancel.cancelled() => anyhow::bail!("{} {} cancelled", cmd, args.join(" ")),
    };
    let duration = start.elapsed();

    let result = ExecResult {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration,
    };

    tracing::debug!(
        cmd,
        args = %args.join(" "),
        exit_code = result.exit_code,
        duration_ms = result.duration.as_millis() as u64,
        "command finished"
    );

    if result.exit_code != 0 {
        anyhow::bail!(
            "{} {} failed (exit {}): {}",
            cmd,
            args.join(" "),
            result.exit_code,
            result.stderr.trim()
        );
    }
    Ok(result)
}
