//! Sudogate — a remote approval gate for privileged commands.
//!
//! Posts the command to a Telegram chat, waits for a listed approver to
//! answer, and only then runs it:
//!
//!   sudogate --channel -100123456 -- systemctl restart nginx
//!   echo "data" | sudogate --channel -100123456 --show-stdin -- tee /etc/motd
//!
//! Exit code is the approved command's own; 1 on denial, timeout, or any
//! setup failure; 130 on interrupt.

mod access;
mod arbiter;
mod channel;
mod config;
mod executor;
mod request;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use crate::config::Config;
use crate::request::ApprovalRequest;

/// Sudogate — ask a human in Telegram before running a privileged command.
///
/// Posts an approval request to the given chat, waits for an authorized
/// approver to approve or deny it, and on approval runs the command with
/// the invoking environment.
#[derive(Parser)]
#[command(
    name = "sudogate",
    version,
    about = "Gate a command behind remote approval in Telegram"
)]
struct Cli {
    /// Telegram chat id to post the approval request to
    #[arg(long, allow_hyphen_values = true)]
    channel: i64,

    /// Thread the request as a reply to this message id
    #[arg(long)]
    reply_to: Option<i32>,

    /// Override the configured approval timeout, in seconds (0 = unset)
    #[arg(long)]
    timeout: Option<u64>,

    /// Read stdin to EOF, show it in the request, and feed it to the command
    #[arg(long)]
    show_stdin: bool,

    /// The command to run once approved
    #[arg(last = true, required = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() {
    // Set up tracing (only show at RUST_LOG=debug level to keep output clean)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sudogate=warn".parse().unwrap()),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    // Usage errors exit 1, not clap's default 2; help/version stay 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    let code = match gate(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!();
            eprintln!("  {} {}", "✗".red().bold(), e);
            for cause in e.chain().skip(1) {
                eprintln!("  {} {}", "caused by:".dimmed(), cause);
            }
            eprintln!();
            1
        }
    };
    std::process::exit(code);
}

/// The whole flow: capture stdin, load config, post, wait, act.
async fn gate(cli: Cli) -> Result<i32> {
    // Stdin is read to EOF before anything touches the network, so a slow
    // pipe can never stall delivery of the request itself.
    let stdin = if cli.show_stdin {
        Some(capture_stdin().context("failed to read stdin")?)
    } else {
        None
    };

    let config = Config::load().context("cannot load configuration")?;
    tracing::debug!(path = config::CONFIG_PATH, "configuration loaded");

    let timeout_secs = config.effective_timeout(cli.timeout);
    let request = ApprovalRequest::new(cli.command, stdin, timeout_secs);

    let channel = channel::from_config(&config, cli.channel, cli.reply_to);
    let mut live = channel
        .open(&request)
        .await
        .context("cannot post the approval request")?;
    tracing::debug!(message_id = live.message_id, "approval request posted");

    eprintln!();
    eprintln!(
        "  {} Waiting for approval of: {}",
        "⏳".yellow(),
        request.command_line().bold()
    );
    eprintln!(
        "  Request {} in chat {}, timeout {}s",
        live.message_id.to_string().cyan(),
        cli.channel,
        timeout_secs
    );

    let decision = arbiter::wait_for_decision(
        &mut live.verdicts,
        std::time::Duration::from_secs(timeout_secs),
    )
    .await?;
    tracing::debug!(%decision, "request resolved");

    Ok(executor::finish(decision, &request, channel, live).await)
}

/// Synchronously drain stdin. Runs before the Telegram connection opens.
fn capture_stdin() -> std::io::Result<Vec<u8>> {
    use std::io::Read;
    let mut buffer = Vec::new();
    std::io::stdin().read_to_end(&mut buffer)?;
    Ok(buffer)
}
