//! Shared Telegram plumbing for the adapters.

use anyhow::{Context, Result};
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode, ReplyParameters};

/// Post an HTML message, optionally threaded and optionally carrying an
/// inline keyboard. Returns the posted message.
pub(crate) async fn post(
    bot: &Bot,
    chat: ChatId,
    reply_to: Option<MessageId>,
    html: &str,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<Message> {
    let mut send = bot.send_message(chat, html).parse_mode(ParseMode::Html);
    if let Some(target) = reply_to {
        send = send.reply_parameters(ReplyParameters::new(target));
    }
    if let Some(keyboard) = keyboard {
        send = send.reply_markup(keyboard);
    }
    send.await.context("failed to post the approval request")
}

/// Replace a message's text. Sending no reply markup in the edit also
/// strips any inline keyboard off the message.
pub(crate) async fn edit(bot: &Bot, chat: ChatId, message: MessageId, html: &str) -> Result<()> {
    bot.edit_message_text(chat, message, html)
        .parse_mode(ParseMode::Html)
        .await
        .context("failed to edit the request message")?;
    Ok(())
}

/// Run the update listener in the background. teloxide's own ctrl-c
/// handling stays off: interrupts must reach the decision wait, not tear
/// down the dispatcher.
pub(crate) fn spawn_listener(
    bot: Bot,
    handler: UpdateHandler<teloxide::RequestError>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        Dispatcher::builder(bot, handler)
            // Unrelated chat traffic is none of our business.
            .default_handler(|_| async {})
            .build()
            .dispatch()
            .await;
    })
}
