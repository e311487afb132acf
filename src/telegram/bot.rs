//! Bot construction and channel identity resolution.

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::Recipient;

use crate::core::config::{network, Config};

/// Creates a Bot instance with an explicit request timeout and an
/// optional custom Bot API URL.
pub fn create_bot(config: &Config) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(network::timeout()).build()?;
    let bot = Bot::with_client(config.bot_token.clone(), client);
    let bot = if let Some(ref api_url) = config.bot_api_url {
        log::info!("Using custom Bot API URL: {}", api_url);
        let url = url::Url::parse(api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
        bot.set_api_url(url)
    } else {
        bot
    };
    Ok(bot)
}

/// Resolves the configured channel to a send target.
///
/// A numeric value is used as a chat id directly. An `@handle` is
/// resolved to its canonical id via `getChat`; when resolution fails
/// the handle is used literally (Telegram accepts usernames in sends).
pub async fn resolve_channel(bot: &Bot, raw: &str) -> Recipient {
    let trimmed = raw.trim();
    if let Ok(id) = trimmed.parse::<i64>() {
        return Recipient::Id(ChatId(id));
    }

    let handle = if trimmed.starts_with('@') {
        trimmed.to_string()
    } else {
        format!("@{}", trimmed)
    };

    match bot
        .get_chat(Recipient::ChannelUsername(handle.clone()))
        .await
    {
        Ok(chat) => Recipient::Id(chat.id),
        Err(e) => {
            log::warn!("could not resolve channel {} ({}), using handle literally", handle, e);
            Recipient::ChannelUsername(handle)
        }
    }
}
