use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Captured result of a finished child.
#[derive(Debug, Clone)]
pub struct Captured {
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("spawn failed: {0}")]
    Spawn(#[source] io::Error),

    #[error("wait failed: {0}")]
    Wait(#[source] io::Error),

    #[error("timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
}

/// Run `cmd` to completion, feeding `stdin` if given.
///
/// The child gets its own process group on unix. When `limit` elapses the
/// whole group is killed, so interpreters that fork helpers do not outlive
/// the call.
pub async fn run(
    mut cmd: Command,
    stdin: Option<String>,
    limit: Duration,
) -> Result<Captured, RunError> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(RunError::Spawn)?;
    let pid = child.id();

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        tokio::spawn(async move {
            if let Err(e) = pipe.write_all(input.as_bytes()).await {
                tracing::debug!(error = %e, "child closed stdin early");
            }
        });
    }

    match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(Captured {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        Ok(Err(e)) => Err(RunError::Wait(e)),
        Err(_) => {
            if let Some(pid) = pid {
                kill_group(pid);
            }
            Err(RunError::Timeout(limit))
        }
    }
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    let Ok(pgid) = i32::try_from(pid) else {
        return;
    };
    // SAFETY: signalling a group we created; a stale id only yields ESRCH.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(pid, "process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {
    // kill_on_drop covers the direct child
}
