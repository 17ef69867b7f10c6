//! Credentials and approver roster for the gate.
//!
//! Everything comes from one JSON file at a fixed path. The path can be
//! changed when the binary is built (`SUDOGATE_CONFIG_PATH`) but never at
//! runtime: the binary is meant to sit behind sudo, and the config file is
//! part of the trust boundary.
//!
//! # Example config file:
//! ```json
//! {
//!   "bot_token": "123456:ABC-DEF...",
//!   "approver_ids": [111111111, 222222222],
//!   "timeout_seconds": 300,
//!   "approval_ux": "buttons"
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Config location, baked in at build time.
pub const CONFIG_PATH: &str = match option_env!("SUDOGATE_CONFIG_PATH") {
    Some(path) => path,
    None => "/etc/sudogate/config.json",
};

/// Wait applied when neither the config nor the invocation names one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Raw file contents before validation. Absent fields decode to their
/// zero forms and are caught (or defaulted) in `validate`.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    bot_token: String,
    #[serde(default)]
    approver_ids: Vec<u64>,
    #[serde(default)]
    timeout_seconds: Option<i64>,
    #[serde(default)]
    approval_ux: Option<ApprovalUx>,
}

/// Which surface approvers use to answer a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalUx {
    /// Inline keyboard under the request message.
    Buttons,
    /// Replies to the request message (emoji or yes/no words).
    Replies,
}

/// Why the configuration could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not valid JSON")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}: {problem}")]
    Invalid { path: String, problem: String },
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot API token.
    pub bot_token: String,
    /// User ids allowed to resolve requests. Never empty.
    pub approvers: HashSet<u64>,
    /// Configured default wait in seconds, already normalized to positive.
    pub timeout_seconds: u64,
    pub approval_ux: ApprovalUx,
}

impl Config {
    /// Load from the baked-in location.
    pub fn load() -> Result<Config, ConfigError> {
        Self::load_from(CONFIG_PATH)
    }

    /// Load and validate a config file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: shown.clone(),
            source,
        })?;
        let raw: RawConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Malformed {
                path: shown.clone(),
                source,
            })?;

        Self::validate(raw, &shown)
    }

    fn validate(raw: RawConfig, path: &str) -> Result<Config, ConfigError> {
        if raw.bot_token.trim().is_empty() {
            return Err(ConfigError::Invalid {
                path: path.to_string(),
                problem: "bot_token is missing or empty".to_string(),
            });
        }
        if raw.approver_ids.is_empty() {
            return Err(ConfigError::Invalid {
                path: path.to_string(),
                problem: "approver_ids must list at least one Telegram user id".to_string(),
            });
        }

        // Non-positive or absent means "use the default".
        let timeout_seconds = match raw.timeout_seconds {
            Some(secs) if secs > 0 => secs as u64,
            _ => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Config {
            bot_token: raw.bot_token,
            approvers: raw.approver_ids.into_iter().collect(),
            timeout_seconds,
            approval_ux: raw.approval_ux.unwrap_or(ApprovalUx::Buttons),
        })
    }

    /// Effective wait for this invocation: a positive per-invocation
    /// override beats the configured default; `--timeout 0` counts as
    /// unset.
    pub fn effective_timeout(&self, cli_override: Option<u64>) -> u64 {
        match cli_override {
            Some(secs) if secs > 0 => secs,
            _ => self.timeout_seconds,
        }
    }
}
