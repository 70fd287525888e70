//! `cli:` runs a command through the host shell and captures stdout.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::IncludeError;

/// The shell leads its own process group so a timeout can take down
/// everything it started.
#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).process_group(0);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// SIGKILL the process group led by `pid`.
#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    let Some(pid) = pid else { return };
    // The group id equals the leader's pid because of `process_group(0)`.
    if unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) } != 0 {
        debug!(pid = pid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

// `kill_on_drop` covers the direct child; cmd.exe has no process groups here.
#[cfg(windows)]
fn kill_group(_pid: Option<u32>) {}

/// Run `command` in `working_dir`, returning its standard output.
///
/// Standard error is only used as failure detail. If the command outlives
/// `timeout`, its whole process group is killed.
pub async fn run(
    command: &str,
    working_dir: &Path,
    timeout: Duration,
) -> Result<String, IncludeError> {
    debug!(
        command = command,
        timeout_secs = timeout.as_secs(),
        working_dir = %working_dir.display(),
        "executing include command"
    );

    let child = shell(command)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| execution_error(command, format!("failed to spawn shell: {e}")))?;

    let pid = child.id();
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(execution_error(command, e.to_string())),
        Err(_) => {
            warn!(command = command, timeout_secs = timeout.as_secs(), "command timed out");
            kill_group(pid);
            return Err(IncludeError::Timeout {
                command: command.to_string(),
                timeout,
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = match stderr.trim() {
            "" => match output.status.code() {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_string(),
            },
            msg => msg.to_string(),
        };
        debug!(command = command, detail = %detail, "command failed");
        return Err(execution_error(command, detail));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn execution_error(command: &str, detail: String) -> IncludeError {
    IncludeError::Execution {
        command: command.to_string(),
        detail,
    }
}
