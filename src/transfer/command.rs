//! External command runner

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{AppError, Result};

/// Time a timed-out command gets to exit after SIGTERM before it is killed
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Outcome of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run `argv` to completion, terminating it if `timeout` elapses first
///
/// The command runs in its own process group. On timeout the whole group gets SIGTERM
/// (sudo relays it to the tool it started), then SIGKILL after a grace period, so no
/// descendant keeps working on the drives. Spawn failures and timeouts are errors; a
/// non-zero exit is reported through `CommandOutput::success`.
pub async fn run_command(argv: &[String], timeout: Option<Duration>) -> Result<CommandOutput> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| AppError::Command("empty command line".to_string()))?;

    debug!("Running: {}", argv.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AppError::Command(format!("failed to start {}: {}", program, e)))?;

    let stdout = tokio::spawn(read_pipe(child.stdout.take()));
    let stderr = tokio::spawn(read_pipe(child.stderr.take()));

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!("{} did not finish within {:?}, terminating", program, limit);
                terminate_group(&mut child).await;
                return Err(AppError::Command(format!(
                    "{} timed out after {:?}",
                    program, limit
                )));
            }
        },
        None => child.wait().await?,
    };

    Ok(CommandOutput {
        success: status.success(),
        stdout: stdout.await.unwrap_or_default(),
        stderr: stderr.await.unwrap_or_default(),
    })
}

/// SIGTERM the child's process group, escalate to SIGKILL, then reap the child
async fn terminate_group(child: &mut Child) {
    let Some(pid) = child.id() else {
        return;
    };
    let group = Pid::from_raw(pid as i32);

    if let Err(e) = killpg(group, Signal::SIGTERM) {
        debug!("SIGTERM to process group {} failed: {}", group, e);
    }
    if tokio::time::timeout(TERMINATE_GRACE, child.wait()).await.is_err() {
        warn!("Process group {} ignored SIGTERM, killing", group);
    }

    // Members that outlived the leader are killed too
    if let Err(e) = killpg(group, Signal::SIGKILL) {
        debug!("SIGKILL to process group {} failed: {}", group, e);
    }
    if let Err(e) = child.wait().await {
        warn!("Failed to reap process {}: {}", pid, e);
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!("Failed to read command output: {}", e);
        }
    }
    String::from_utf8_lossy(&buf).trim().to_string()
}
