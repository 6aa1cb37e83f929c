use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub relay: RelayConfig,
    #[serde(default = "default_health_config")]
    pub health: HealthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub api_id: i32,
    /// Checked at startup for parity with MTProto deployments; the Bot API
    /// only needs the token.
    #[allow(dead_code)]
    pub api_hash: String,
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// Chats whose posts are parsed and relayed
    pub source_channels: Vec<i64>,
    /// Chats that receive relayed posts, in delivery order
    pub target_channels: Vec<i64>,
    /// Seconds between two queued deliveries
    #[serde(default = "default_queue_delay")]
    pub queue_delay: u64,
    /// Seconds after an immediate send during which new posts are queued
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u64,
}

impl RelayConfig {
    pub fn queue_delay(&self) -> Duration {
        Duration::from_secs(self.queue_delay)
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_secs(self.rate_limit)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_queue_delay() -> u64 {
    120
}

fn default_rate_limit() -> u64 {
    60
}

fn default_port() -> u16 {
    8080
}

fn default_health_config() -> HealthConfig {
    HealthConfig {
        port: default_port(),
    }
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from process environment variables (API_ID, BOT_TOKEN, ...).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String> {
            lookup(name).with_context(|| format!("Missing required environment variable: {}", name))
        };

        let config = Config {
            telegram: TelegramConfig {
                api_id: parse_value("API_ID", &required("API_ID")?)?,
                api_hash: required("API_HASH")?,
                bot_token: required("BOT_TOKEN")?,
            },
            relay: RelayConfig {
                source_channels: parse_ids("SOURCE_CHANNELS", &required("SOURCE_CHANNELS")?)?,
                target_channels: parse_ids("TARGET_CHANNELS", &required("TARGET_CHANNELS")?)?,
                queue_delay: optional(&lookup, "QUEUE_DELAY")?.unwrap_or_else(default_queue_delay),
                rate_limit: optional(&lookup, "RATE_LIMIT")?.unwrap_or_else(default_rate_limit),
            },
            health: HealthConfig {
                port: optional(&lookup, "PORT")?.unwrap_or_else(default_port),
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.relay.source_channels.is_empty() {
            anyhow::bail!("At least one source channel is required");
        }
        if self.relay.target_channels.is_empty() {
            anyhow::bail!("At least one target channel is required");
        }
        Ok(())
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", name, value))
}

/// Unset and empty both mean "use the default".
fn optional<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => parse_value(name, &value).map(Some),
        _ => Ok(None),
    }
}

/// Comma-separated chat ids, e.g. "-1001234,-1005678"
fn parse_ids(name: &str, value: &str) -> Result<Vec<i64>> {
    value
        .split(',')
        .map(|id| parse_value(name, id))
        .collect()
}
