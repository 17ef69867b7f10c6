//! Building the request message shown to approvers.
//!
//! The body is rendered once, before anything touches the network, and
//! re-rendered byte-for-byte at resolve time so the status line can be
//! appended under it. Captured stdin is the only part that can blow the
//! platform's message limit, so it alone gets truncated.

use chrono::{DateTime, Utc};

/// Telegram's hard limit on message text length.
pub const MESSAGE_LIMIT: usize = 4096;

/// Headroom kept free for the truncation marker and the status line
/// appended when the request resolves.
const RESOLVE_SLACK: usize = 120;

const STDIN_HEADER: &str = "\n<b>Stdin:</b>\n<pre>";
const STDIN_FOOTER: &str = "</pre>";

/// One privileged-execution ask, assembled before any network activity.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    /// Program and arguments, exactly as they will be executed.
    pub command: Vec<String>,
    /// Captured stdin when `--show-stdin` was given.
    pub stdin: Option<Vec<u8>>,
    pub host: String,
    pub cwd: String,
    /// Effective timeout, shown to approvers and armed by the waiter.
    pub timeout_secs: u64,
    pub created_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn new(command: Vec<String>, stdin: Option<Vec<u8>>, timeout_secs: u64) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            command,
            stdin,
            host,
            cwd,
            timeout_secs,
            created_at: Utc::now(),
        }
    }

    /// The argv joined for display. Execution never sees this string.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    /// Render the HTML body, fitting captured stdin into whatever budget
    /// remains under the platform limit. Pure with respect to the struct:
    /// rendering twice produces identical bytes.
    pub fn render_html(&self) -> String {
        let mut body = format!(
            "🔐 <b>Approval required</b>\n<pre>{}</pre>\n<b>Host:</b> {}\n<b>Dir:</b> {}\n<b>Timeout:</b> {}s",
            html_escape(&self.command_line()),
            html_escape(&self.host),
            html_escape(&self.cwd),
            self.timeout_secs,
        );

        if let Some(stdin) = &self.stdin {
            if !stdin.is_empty() {
                let escaped = html_escape(&String::from_utf8_lossy(stdin));
                let budget = MESSAGE_LIMIT.saturating_sub(
                    body.len() + STDIN_HEADER.len() + STDIN_FOOTER.len() + RESOLVE_SLACK,
                );
                body.push_str(STDIN_HEADER);
                body.push_str(&truncate_display(&escaped, budget));
                body.push_str(STDIN_FOOTER);
            }
        }

        body
    }
}

/// Minimal escaping for Telegram's HTML parse mode.
pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Cut `text` down to at most `budget` bytes and say how much was
/// dropped. The cut lands on a char boundary and never leaves a dangling
/// HTML entity. Pure: the same text and budget always produce the same
/// output.
pub fn truncate_display(text: &str, budget: usize) -> String {
    if text.len() <= budget {
        return text.to_string();
    }

    let mut cut = budget;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }

    // An escaped entity is at most 6 bytes, so only the tail can hold a
    // split one.
    let window = cut.saturating_sub(6);
    if let Some(amp) = text[window..cut].rfind('&') {
        if !text[window + amp..cut].contains(';') {
            cut = window + amp;
        }
    }

    format!(
        "{}\n... ({} bytes truncated)",
        &text[..cut],
        text.len() - cut
    )
}
