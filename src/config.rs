use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Chats where service messages get removed. Everything else is ignored.
    #[serde(default)]
    pub chats_to_clean: Vec<i64>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    /// Public base URL Telegram delivers updates to (without the path).
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_webhook_path")]
    pub path: String,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub secret_token: Option<String>,
    #[serde(default)]
    pub drop_pending_updates: bool,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chats_to_clean: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            path: default_webhook_path(),
            listen: default_listen(),
            secret_token: None,
            drop_pending_updates: false,
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Config {
    /// Load the config file (if present), apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with overrides taken from `lookup` instead of the environment.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            info!(
                "Config file {} not found, using environment only",
                path.display()
            );
            Config::default()
        };

        config.apply_overrides(lookup)?;
        config.validate()?;

        Ok(config)
    }

    /// Override file values with `BOT_TOKEN`, `WEBHOOK_URL`, `CHATS_TO_CLEAN`,
    /// `WEBHOOK_LISTEN` and `WEBHOOK_SECRET_TOKEN` when set.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = lookup("BOT_TOKEN") {
            self.telegram.bot_token = token.trim().to_string();
        }
        if let Some(url) = lookup("WEBHOOK_URL") {
            self.webhook.url = url.trim().to_string();
        }
        if let Some(chats) = lookup("CHATS_TO_CLEAN") {
            self.telegram.chats_to_clean =
                parse_chat_ids(&chats).context("Invalid CHATS_TO_CLEAN")?;
        }
        if let Some(listen) = lookup("WEBHOOK_LISTEN") {
            self.webhook.listen = listen.trim().to_string();
        }
        if let Some(secret) = lookup("WEBHOOK_SECRET_TOKEN") {
            self.webhook.secret_token = Some(secret.trim().to_string());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            bail!("telegram.bot_token is not set (or BOT_TOKEN)");
        }
        self.webhook_endpoint()?;
        self.listen_addr()?;

        for origin in &self.webhook.cors_origins {
            if origin == "*" {
                continue;
            }
            let url = Url::parse(origin)
                .with_context(|| format!("Invalid webhook.cors_origins entry: {}", origin))?;
            if url.scheme() != "https" && url.scheme() != "http" {
                bail!("webhook.cors_origins entry must be http(s): {}", origin);
            }
        }

        if let Some(secret) = &self.webhook.secret_token {
            let valid_chars = secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if secret.is_empty() || secret.len() > 256 || !valid_chars {
                bail!("webhook.secret_token must be 1-256 characters of A-Z, a-z, 0-9, _ and -");
            }
        }
        Ok(())
    }

    /// Full URL registered with Telegram: `webhook.url` followed by `webhook.path`.
    pub fn webhook_endpoint(&self) -> Result<Url> {
        if self.webhook.url.trim().is_empty() {
            bail!("webhook.url is not set (or WEBHOOK_URL)");
        }
        if !self.webhook.path.starts_with('/') {
            bail!("webhook.path must start with '/': {}", self.webhook.path);
        }

        let base = self.webhook.url.trim().trim_end_matches('/');
        let endpoint = format!("{}{}", base, self.webhook.path);
        let url = Url::parse(&endpoint)
            .with_context(|| format!("Invalid webhook URL: {}", endpoint))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            bail!("webhook.url must be http(s): {}", endpoint);
        }
        Ok(url)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.webhook
            .listen
            .parse()
            .with_context(|| format!("Invalid webhook.listen address: {}", self.webhook.listen))
    }
}

/// Parse a list of chat ids such as `-100123, 42` or `[-100123 42]`.
pub fn parse_chat_ids(raw: &str) -> Result<Vec<i64>> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split([',', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .with_context(|| format!("Not a chat id: {}", s))
        })
        .collect()
}
