//! The notification channel: how a request reaches approvers and how
//! their verdicts come back.
//!
//! One trait, two adapters. `buttons` posts an inline keyboard and
//! listens for callback presses; `replies` posts a bare request and
//! listens for replies matched against a small vocabulary. Both deliver
//! screened verdicts into the single-slot channel and stay out of the
//! decision logic entirely.

pub mod buttons;
pub mod replies;
mod telegram;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::arbiter::Verdict;
use crate::config::{ApprovalUx, Config};
use crate::request::ApprovalRequest;

pub use buttons::ButtonsChannel;
pub use replies::RepliesChannel;

/// A request that has been posted and is collecting verdicts.
pub struct LiveRequest {
    /// Telegram message id of the posted request.
    pub message_id: i32,
    /// Receiving side of the verdict slot.
    pub verdicts: mpsc::Receiver<Verdict>,
    /// The update listener feeding the slot.
    pub listener: JoinHandle<()>,
}

impl LiveRequest {
    /// Stop listening for platform events. A verdict already in the slot
    /// stays readable; nothing new arrives.
    pub fn close(&self) {
        self.listener.abort();
    }
}

/// Posting, finalizing, and listening on one approval surface.
#[async_trait]
pub trait ApprovalChannel {
    /// Post the request and start collecting verdicts for it.
    async fn open(&self, request: &ApprovalRequest) -> Result<LiveRequest>;

    /// Replace the request text with its resolved form, dropping any
    /// interactive controls. Cosmetic: callers must not let a failure
    /// here change the process outcome.
    async fn finalize(&self, message_id: i32, text: &str) -> Result<()>;
}

/// Pick the adapter the config asks for.
pub fn from_config(
    config: &Config,
    chat: i64,
    reply_to: Option<i32>,
) -> Arc<dyn ApprovalChannel + Send + Sync> {
    match config.approval_ux {
        ApprovalUx::Buttons => Arc::new(ButtonsChannel::new(config, chat, reply_to)),
        ApprovalUx::Replies => Arc::new(RepliesChannel::new(config, chat, reply_to)),
    }
}
