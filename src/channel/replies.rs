//! Reply-based approval: the request message carries no controls and
//! approvers answer by replying to it with a recognized emoji or word.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tokio::sync::mpsc;

use crate::access::{self, ReviewEvent, Screen};
use crate::arbiter::{self, Verdict};
use crate::channel::{telegram, ApprovalChannel, LiveRequest};
use crate::config::Config;
use crate::request::ApprovalRequest;

pub struct RepliesChannel {
    bot: Bot,
    chat: ChatId,
    reply_to: Option<MessageId>,
    approvers: Arc<HashSet<u64>>,
}

impl RepliesChannel {
    pub fn new(config: &Config, chat: i64, reply_to: Option<i32>) -> Self {
        Self {
            bot: Bot::new(config.bot_token.clone()),
            chat: ChatId(chat),
            reply_to: reply_to.map(MessageId),
            approvers: Arc::new(config.approvers.clone()),
        }
    }
}

#[async_trait]
impl ApprovalChannel for RepliesChannel {
    async fn open(&self, request: &ApprovalRequest) -> Result<LiveRequest> {
        let body = format!(
            "{}\n\n<i>Reply with ✅ (yes) or ❌ (no) to decide.</i>",
            request.render_html()
        );
        let message = telegram::post(&self.bot, self.chat, self.reply_to, &body, None).await?;

        let (slot, verdicts) = arbiter::verdict_slot();
        let live_message = message.id.0;

        let handler = Update::filter_message().endpoint({
            let approvers = Arc::clone(&self.approvers);
            move |msg: Message| {
                let approvers = Arc::clone(&approvers);
                let slot = slot.clone();
                async move {
                    handle_reply(&msg, live_message, &approvers, &slot);
                    respond(())
                }
            }
        });
        let listener = telegram::spawn_listener(self.bot.clone(), handler);

        Ok(LiveRequest {
            message_id: live_message,
            verdicts,
            listener,
        })
    }

    async fn finalize(&self, message_id: i32, text: &str) -> Result<()> {
        telegram::edit(&self.bot, self.chat, MessageId(message_id), text).await
    }
}

/// Screen one chat message; only replies to the request can count.
fn handle_reply(
    msg: &Message,
    live_message: i32,
    approvers: &HashSet<u64>,
    slot: &mpsc::Sender<Verdict>,
) {
    let target = match msg.reply_to_message() {
        Some(replied) => replied.id.0,
        None => return,
    };
    let actor = match &msg.from {
        Some(user) => user.id.0,
        None => return,
    };
    let text = match msg.text() {
        Some(text) => text.to_string(),
        None => return,
    };

    let event = ReviewEvent {
        actor,
        target,
        tag: text,
    };
    if let Screen::Authorized(verdict) = access::screen(&event, live_message, approvers) {
        arbiter::offer(slot, verdict);
    }
}
