use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::payloads::SetWebhookSetters;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, ChatId, MessageId};
use teloxide::RequestError;
use tracing::info;

use crate::config::Config;
use crate::platform::MessageDeleter;

#[async_trait]
impl MessageDeleter for Bot {
    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), RequestError> {
        Requester::delete_message(self, chat_id, message_id).await?;
        Ok(())
    }
}

/// Build the long-lived bot handle used for every Bot API call.
pub fn build_bot(config: &Config) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(config.telegram.request_timeout_secs))
        .build()
        .context("Failed to build Telegram HTTP client")?;
    Ok(Bot::with_client(&config.telegram.bot_token, client))
}

/// Tell Telegram where to deliver updates, then log what it reports back.
pub async fn register_webhook(bot: &Bot, config: &Config) -> Result<()> {
    let endpoint = config.webhook_endpoint()?;

    let mut request = bot
        .set_webhook(endpoint.clone())
        .allowed_updates(vec![AllowedUpdate::Message])
        .drop_pending_updates(config.webhook.drop_pending_updates);
    if let Some(secret) = &config.webhook.secret_token {
        request = request.secret_token(secret.clone());
    }
    request
        .await
        .with_context(|| format!("Failed to register webhook {}", endpoint))?;

    info!("Webhook registered {}", endpoint);

    let webhook_info = bot
        .get_webhook_info()
        .await
        .context("Failed to fetch webhook info")?;
    info!(
        "Webhook info: url={:?} pending_updates={} last_error={:?}",
        webhook_info.url.as_ref().map(|u| u.as_str()),
        webhook_info.pending_update_count,
        webhook_info.last_error_message
    );

    Ok(())
}
