use std::env;

use teloxide::prelude::*;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Notification cue for signal arrivals: forwards alert texts to a Telegram
/// chat. Best effort only; a failed send never disturbs the session.
pub struct TelegramService {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramService {
    /// The cue is optional: without credentials the dashboard simply runs
    /// without it.
    pub fn from_env() -> Option<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = env::var("TELEGRAM_CHAT_ID").ok()?.parse::<i64>().ok()?;

        Some(Self {
            bot: Bot::new(token),
            chat_id: ChatId(chat_id),
        })
    }

    pub async fn start(self, mut rx: broadcast::Receiver<String>) {
        info!("Starting Telegram notification cue");

        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = self.bot.send_message(self.chat_id, msg).await {
                        error!("Failed to send Telegram message: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    error!("Telegram cue lagged behind. Missed {} messages.", n);
                }
                Err(_) => {
                    info!("Notification channel closed. Stopping cue.");
                    break;
                }
            }
        }
    }
}
