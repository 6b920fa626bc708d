//! tg-cleaner setup wizard.
//!
//! Asks for the bot token, the chats to clean and the webhook settings in the
//! terminal, then writes `config.toml` to the project root (`TG_CLEANER_ROOT`
//! or the current directory).

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

// ── Config formatting ──────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    bot_token: &'a str,
    chat_ids: &'a [i64],
    webhook_url: &'a str,
    listen: &'a str,
    secret_token: &'a str,
}

/// Quote a value as a TOML basic string, escaping as needed.
fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_owned()).to_string()
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let ids_str = p
        .chat_ids
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let secret_line = if p.secret_token.is_empty() {
        "# secret_token = \"letters-digits_and-dashes\"".to_owned()
    } else {
        format!("secret_token = {}", toml_string(p.secret_token))
    };

    let bot_token = toml_string(p.bot_token);
    let webhook_url = toml_string(p.webhook_url.trim_end_matches('/'));
    let listen = toml_string(p.listen);

    format!(
        r#"[telegram]
bot_token = {bot_token}
chats_to_clean = [{ids_str}]

[webhook]
url = {webhook_url}
path = "/webhook"
listen = {listen}
{secret_line}
"#
    )
}

/// Parse chat ids such as `-100123, 42`; same rules as the bot's `CHATS_TO_CLEAN`.
fn parse_chat_ids(raw: &str) -> Result<Vec<i64>> {
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

// ── CLI ────────────────────────────────────────────────────────────────────────

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(buf.trim().to_owned())
}

/// Ask again until the answer is a list of chat ids.
fn read_chat_ids() -> Result<Vec<i64>> {
    loop {
        let raw = read_line("Chats to clean (comma-separated ids, e.g. -1001234567890): ")?;
        match parse_chat_ids(&raw) {
            Ok(ids) => return Ok(ids),
            Err(e) => println!("  {e:#}, try again"),
        }
    }
}

fn or_default(s: String, default: &str) -> String {
    if s.is_empty() {
        default.to_owned()
    } else {
        s
    }
}

fn run_cli(project_root: &Path) -> Result<()> {
    println!("=== tg-cleaner setup ===\n");

    let bot_token = read_line("Telegram bot token: ")?;
    let chat_ids = read_chat_ids()?;
    let webhook_url = read_line("Public webhook base URL (e.g. https://bot.example.com): ")?;
    let listen = or_default(read_line("Listen address [0.0.0.0:8000]: ")?, "0.0.0.0:8000");
    let secret_token = read_line("Webhook secret token (optional): ")?;

    let config = format_config(&ConfigParams {
        bot_token: &bot_token,
        chat_ids: &chat_ids,
        webhook_url: &webhook_url,
        listen: &listen,
        secret_token: &secret_token,
    });

    let config_path = project_root.join("config.toml");
    std::fs::write(&config_path, &config)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    println!("\n✓  config.toml saved to {}", config_path.display());
    println!("   Run the bot with:  cargo run");
    Ok(())
}

fn main() -> Result<()> {
    // Resolve project root: prefer TG_CLEANER_ROOT env, fall back to cwd.
    let project_root =
        PathBuf::from(std::env::var("TG_CLEANER_ROOT").unwrap_or_else(|_| ".".to_string()));

    run_cli(&project_root)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
