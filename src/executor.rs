//! Turning a decision into its process-level effect.
//!
//! The request message gets its status line first (best effort), the
//! platform connection is released, and only then does anything run.
//! Exit codes come from the decision alone; an approved command owns the
//! process from that point on.

use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::sync::Arc;

use colored::Colorize;

use crate::arbiter::Decision;
use crate::channel::{ApprovalChannel, LiveRequest};
use crate::request::ApprovalRequest;

/// Exit code for denial, timeout, and any failure to run the command.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for an interrupted wait (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

/// Apply the decision: update the request message, release the channel,
/// then run or refuse the command. Returns the process exit code; the
/// approved path without captured stdin replaces the process image and
/// only returns if that failed.
pub async fn finish(
    decision: Decision,
    request: &ApprovalRequest,
    channel: Arc<dyn ApprovalChannel + Send + Sync>,
    live: LiveRequest,
) -> i32 {
    let resolved = format!(
        "{}\n\n{}",
        request.render_html(),
        status_line(&decision, request.timeout_secs)
    );
    if let Err(err) = channel.finalize(live.message_id, &resolved).await {
        tracing::warn!("could not update the request message: {:#}", err);
    }

    // Release the platform before acting on the decision.
    live.close();
    drop(channel);

    match decision {
        Decision::Approved { by } => {
            eprintln!(
                "  {} Approved by {} - running: {}",
                "✓".green().bold(),
                by,
                request.command_line().bold()
            );
            run_command(request).await
        }
        Decision::Denied { by } => {
            eprintln!("  {} Denied by {}", "✗".red().bold(), by);
            EXIT_FAILURE
        }
        Decision::TimedOut => {
            eprintln!(
                "  {} No decision within {}s",
                "⚠".yellow(),
                request.timeout_secs
            );
            EXIT_FAILURE
        }
        Decision::Cancelled => {
            eprintln!("  {} Cancelled", "⚠".yellow());
            EXIT_INTERRUPTED
        }
    }
}

/// Status appended under the request body once it resolves.
pub fn status_line(decision: &Decision, timeout_secs: u64) -> String {
    match decision {
        Decision::Approved { by } => format!("✅ <b>Approved</b> by {}. Executing...", by),
        Decision::Denied { by } => format!("❌ <b>Denied</b> by {}.", by),
        Decision::TimedOut => format!("⏰ <b>Timed out</b> after {}s.", timeout_secs),
        Decision::Cancelled => "⚠️ <b>Cancelled</b> (interrupted).".to_string(),
    }
}

/// Run the approved command. Without captured stdin the process image is
/// replaced and this never returns; with it, the command runs as a child
/// fed the captured bytes.
async fn run_command(request: &ApprovalRequest) -> i32 {
    match &request.stdin {
        Some(data) => spawn_with_stdin(&request.command, data).await,
        None => replace_process(&request.command),
    }
}

/// Become the command: environment and descriptors carry over, signal
/// delivery and exit codes belong to it. Returns only if exec failed.
fn replace_process(command: &[String]) -> i32 {
    let err = std::process::Command::new(&command[0])
        .args(&command[1..])
        .exec();
    eprintln!(
        "  {} Failed to execute {}: {}",
        "✗".red().bold(),
        command[0],
        err
    );
    EXIT_FAILURE
}

/// Child-process variant for captured stdin. Stdout and stderr stay
/// plugged into the caller's own.
async fn spawn_with_stdin(command: &[String], data: &[u8]) -> i32 {
    use tokio::io::AsyncWriteExt;

    let mut child = match tokio::process::Command::new(&command[0])
        .args(&command[1..])
        .stdin(std::process::Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            eprintln!(
                "  {} Failed to start {}: {}",
                "✗".red().bold(),
                command[0],
                err
            );
            return EXIT_FAILURE;
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(err) = stdin.write_all(data).await {
            tracing::warn!("could not write captured stdin to the child: {}", err);
        }
        // Dropping the handle closes the pipe; the child sees EOF.
    }

    match child.wait().await {
        Ok(status) => exit_code_of(status),
        Err(err) => {
            eprintln!(
                "  {} Failed waiting for {}: {}",
                "✗".red().bold(),
                command[0],
                err
            );
            EXIT_FAILURE
        }
    }
}

/// Child exit code, with signal deaths mapped to the shell convention.
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => 128 + status.signal().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    #[test]
    fn test_status_lines() {
        let line = status_line(&Decision::Approved { by: 42 }, 300);
        assert!(line.contains("Approved"));
        assert!(line.contains("42"));

        let line = status_line(&Decision::Denied { by: 7 }, 300);
        assert!(line.contains("Denied"));
        assert!(line.contains('7'));

        let line = status_line(&Decision::TimedOut, 2);
        assert!(line.contains("Timed out"));
        assert!(line.contains('2'));

        let line = status_line(&Decision::Cancelled, 300);
        assert!(line.contains("Cancelled"));
    }

    #[test]
    fn test_exit_code_of_plain_exits() {
        assert_eq!(exit_code_of(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code_of(ExitStatus::from_raw(7 << 8)), 7);
    }

    #[test]
    fn test_exit_code_of_signal_deaths() {
        // SIGINT and SIGKILL land on the 128+n shell convention.
        assert_eq!(exit_code_of(ExitStatus::from_raw(2)), 130);
        assert_eq!(exit_code_of(ExitStatus::from_raw(9)), 137);
    }

    #[tokio::test]
    async fn test_spawn_propagates_exit_code() {
        let command = vec!["sh".to_string(), "-c".to_string(), "exit 7".to_string()];
        assert_eq!(spawn_with_stdin(&command, b"").await, 7);
    }

    #[tokio::test]
    async fn test_spawn_feeds_captured_stdin() {
        // The child proves it saw the bytes by exiting 0 only on a match.
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"read line; [ "$line" = hello ]"#.to_string(),
        ];
        assert_eq!(spawn_with_stdin(&command, b"hello\n").await, 0);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_exit_one() {
        let command = vec!["/nonexistent/definitely-not-a-binary".to_string()];
        assert_eq!(spawn_with_stdin(&command, b"").await, EXIT_FAILURE);
    }
}
