mod cleaner;
mod config;
mod filter;
mod platform;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cleaner::{AllowList, Cleaner};
use crate::config::Config;
use crate::platform::telegram;
use crate::webhook::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tg_cleaner=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let endpoint = config.webhook_endpoint()?;
    let listen = config.listen_addr()?;

    info!("Configuration loaded successfully");
    let allow_list = AllowList::new(&config.telegram.chats_to_clean);
    if allow_list.is_empty() {
        warn!("chats_to_clean is empty, no messages will ever be deleted");
    }

    info!(
        "  Chats to clean ({}): {:?}",
        allow_list.len(),
        config.telegram.chats_to_clean
    );
    info!("  Webhook endpoint: {}", endpoint);
    info!("  Listening on: {}", listen);
    info!(
        "  Secret token: {}",
        if config.webhook.secret_token.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );

    let bot = telegram::build_bot(&config)?;

    info!("Starting up actions");
    telegram::register_webhook(&bot, &config).await?;

    let cleaner = Cleaner::new(allow_list, Arc::new(bot.clone()));
    let state = AppState {
        cleaner: Arc::new(cleaner),
        secret_token: config.webhook.secret_token.as_deref().map(Arc::from),
    };
    let app = webhook::build_app(state, &config.webhook.path, &config.webhook.cors_origins);

    webhook::serve(listen, app, webhook::shutdown_signal()).await?;

    // The router (and the cleaner's bot clone) is gone once serve returns
    drop(bot);
    info!("Telegram session closed");
    Ok(())
}
