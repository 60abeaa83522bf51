//! Runtime configuration loaded from the environment
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{anyhow, Result};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_NICKNAMES: &str = "Bole,Kukku Patto";

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub discord_guild_id: Option<String>,
    pub openai_api_key: String,
    pub openai_model: String,
    pub database_path: String,
    pub log_level: String,
    /// Pet names the bot uses when addressing the user
    pub nicknames: Vec<String>,
    /// Dispatch period; always divides one minute evenly
    pub dispatch_tick: Duration,
    pub delivery_max_attempts: u32,
    pub delivery_retry_delay: Duration,
    pub extraction_max_attempts: u32,
    /// How many recent conversation turns are fed back as context
    pub history_turns: usize,
    pub ai_timeout: Duration,
    pub dispatch_item_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token =
            get("DISCORD_TOKEN").ok_or_else(|| anyhow!("DISCORD_TOKEN must be set"))?;
        let openai_api_key =
            get("OPENAI_API_KEY").ok_or_else(|| anyhow!("OPENAI_API_KEY must be set"))?;

        let nicknames: Vec<String> = get("CARE_NICKNAMES")
            .unwrap_or_else(|| DEFAULT_NICKNAMES.to_string())
            .split(',')
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if nicknames.is_empty() {
            return Err(anyhow!("CARE_NICKNAMES must contain at least one name"));
        }

        let tick_seconds: u64 = parse_or(&get, "DISPATCH_TICK_SECONDS", 60)?;
        if tick_seconds == 0 || 60 % tick_seconds != 0 {
            return Err(anyhow!(
                "DISPATCH_TICK_SECONDS must divide 60 evenly (got {tick_seconds})"
            ));
        }

        let delivery_max_attempts: u32 = parse_or(&get, "DELIVERY_MAX_ATTEMPTS", 3)?;
        let extraction_max_attempts: u32 = parse_or(&get, "EXTRACTION_MAX_ATTEMPTS", 3)?;
        if delivery_max_attempts == 0 || extraction_max_attempts == 0 {
            return Err(anyhow!("Attempt counts must be at least 1"));
        }

        let ai_timeout = Duration::from_secs(parse_or(&get, "AI_TIMEOUT_SECONDS", 45)?);
        let dispatch_item_timeout =
            Duration::from_secs(parse_or(&get, "DISPATCH_ITEM_TIMEOUT_SECONDS", 50)?);
        if ai_timeout >= dispatch_item_timeout {
            return Err(anyhow!(
                "AI_TIMEOUT_SECONDS ({}) must be below DISPATCH_ITEM_TIMEOUT_SECONDS ({})",
                ai_timeout.as_secs(),
                dispatch_item_timeout.as_secs()
            ));
        }

        Ok(Config {
            discord_token,
            discord_guild_id: get("DISCORD_GUILD_ID"),
            openai_api_key,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            database_path: get("DATABASE_PATH").unwrap_or_else(|| "carebot.db".to_string()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            nicknames,
            dispatch_tick: Duration::from_secs(tick_seconds),
            delivery_max_attempts,
            delivery_retry_delay: Duration::from_millis(parse_or(
                &get,
                "DELIVERY_RETRY_DELAY_MS",
                2000,
            )?),
            extraction_max_attempts,
            history_turns: parse_or(&get, "HISTORY_TURNS", 10)?,
            ai_timeout,
            dispatch_item_timeout,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}
