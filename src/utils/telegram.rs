use anyhow::Context;
use async_trait::async_trait;
use log::info;
use teloxide::Bot;
use teloxide::prelude::{ChatId, Requester};
use crate::models::Grade;
use crate::utils::notify::{compose_message, Notifier};

// Sends new grades to one Telegram chat.
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    // Reads the bot token and chat ID from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let bot_token = std::env::var("BOT_TOKEN").context("BOT_TOKEN environment variable not found")?;
        let chat_id = std::env::var("CHAT_ID").context("CHAT_ID environment variable not found")?;
        let chat_id = chat_id
            .trim()
            .parse::<i64>()
            .with_context(|| format!("CHAT_ID {:?} is not a numeric chat id", chat_id))?;

        Ok(TelegramNotifier {
            bot: Bot::new(bot_token),
            chat_id: ChatId(chat_id),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, grades: &[Grade], username: &str) -> anyhow::Result<()> {
        let message = compose_message(grades);
        let sent = self
            .bot
            .send_message(self.chat_id, message.to_string())
            .await
            .with_context(|| format!("Telegram message for {} wasn't sent", username))?;
        info!("Text message sent successfully {:?}", sent.id);
        Ok(())
    }
}
