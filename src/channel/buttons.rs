//! Inline-keyboard approval: the request message carries Approve/Deny
//! buttons and verdicts arrive as callback queries.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, MaybeInaccessibleMessage, MessageId,
};
use tokio::sync::mpsc;

use crate::access::{self, ReviewEvent, Screen};
use crate::arbiter::{self, Verdict};
use crate::channel::{telegram, ApprovalChannel, LiveRequest};
use crate::config::Config;
use crate::request::ApprovalRequest;

pub struct ButtonsChannel {
    bot: Bot,
    chat: ChatId,
    reply_to: Option<MessageId>,
    approvers: Arc<HashSet<u64>>,
}

impl ButtonsChannel {
    pub fn new(config: &Config, chat: i64, reply_to: Option<i32>) -> Self {
        Self {
            bot: Bot::new(config.bot_token.clone()),
            chat: ChatId(chat),
            reply_to: reply_to.map(MessageId),
            approvers: Arc::new(config.approvers.clone()),
        }
    }
}

fn keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Approve", access::APPROVE_DATA),
        InlineKeyboardButton::callback("❌ Deny", access::DENY_DATA),
    ]])
}

#[async_trait]
impl ApprovalChannel for ButtonsChannel {
    async fn open(&self, request: &ApprovalRequest) -> Result<LiveRequest> {
        let message = telegram::post(
            &self.bot,
            self.chat,
            self.reply_to,
            &request.render_html(),
            Some(keyboard()),
        )
        .await?;

        let (slot, verdicts) = arbiter::verdict_slot();
        let live_message = message.id.0;

        // The id of the message just posted is baked into the handler;
        // screening carries no shared state.
        let handler = Update::filter_callback_query().endpoint({
            let approvers = Arc::clone(&self.approvers);
            move |bot: Bot, q: CallbackQuery| {
                let approvers = Arc::clone(&approvers);
                let slot = slot.clone();
                async move {
                    handle_press(bot, q, live_message, &approvers, &slot).await;
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

/// Screen one button press: forward it, notice it, or drop it.
async fn handle_press(
    bot: Bot,
    q: CallbackQuery,
    live_message: i32,
    approvers: &HashSet<u64>,
    slot: &mpsc::Sender<Verdict>,
) {
    let target = match &q.message {
        Some(MaybeInaccessibleMessage::Regular(m)) => m.id.0,
        _ => return,
    };
    let tag = match &q.data {
        Some(data) => data.clone(),
        None => return,
    };
    let event = ReviewEvent {
        actor: q.from.id.0,
        target,
        tag,
    };

    match access::screen(&event, live_message, approvers) {
        Screen::Authorized(verdict) => {
            arbiter::offer(slot, verdict);
            // Stops the client-side spinner on the pressed button.
            let _ = bot.answer_callback_query(q.id).await;
        }
        Screen::Unauthorized => {
            let _ = bot
                .answer_callback_query(q.id)
                .text("You are not an authorized approver.")
                .await;
        }
        Screen::WrongTarget | Screen::Unrecognized => {}
    }
}
