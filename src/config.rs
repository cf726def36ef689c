//! Configuration loading.
//!
//! Precedence: env vars > `tgrelay.toml` > defaults. The config file path
//! comes from `$TGRELAY_CONFIG_PATH`, defaulting to `./tgrelay.toml`; a
//! missing file is fine. The env names for the platform settings follow
//! the adapter's historical convention: `TELEGRAM_TOKEN`,
//! `TELEGRAM_WEBHOOK`, `TELEGRAM_INTERVAL`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::error::AdapterError;

/// Adapter configuration.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bot API token. Required at startup; its absence is the one fatal
    /// configuration error.
    pub token: Option<String>,
    /// Webhook base URL. When set, the adapter registers
    /// `{webhook}/{token}` and expects the host router to feed it update
    /// bodies; when unset it polls.
    pub webhook: Option<String>,
    /// Poll interval in milliseconds.
    pub interval_ms: u64,
    /// Advisory bot name for mention handling, checked against the
    /// platform username at startup.
    pub bot_name: Option<String>,
    /// Path of the broadcast roster file.
    pub roster_path: String,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            webhook: None,
            interval_ms: 500,
            bot_name: None,
            roster_path: "groups.data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("token", &self.token.as_ref().map(|_| "__REDACTED__"))
            .field("webhook", &self.webhook)
            .field("interval_ms", &self.interval_ms)
            .field("bot_name", &self.bot_name)
            .field("roster_path", &self.roster_path)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_from_file() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                let config: Config =
                    toml::from_str(&contents).context("failed to parse config TOML")?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(anyhow::anyhow!("failed to read config file: {e}")),
        }
    }

    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("TGRELAY_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("tgrelay.toml"))
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function for testability.
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("TELEGRAM_TOKEN") {
            self.token = Some(v);
        }
        if let Some(v) = env("TELEGRAM_WEBHOOK") {
            self.webhook = Some(v);
        }
        if let Some(v) = env("TELEGRAM_INTERVAL") {
            match v.parse() {
                Ok(ms) => self.interval_ms = ms,
                Err(_) => warn!(
                    var = "TELEGRAM_INTERVAL",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("TGRELAY_BOT_NAME") {
            self.bot_name = Some(v);
        }
        if let Some(v) = env("TGRELAY_ROSTER_PATH") {
            self.roster_path = v;
        }
        if let Some(v) = env("TGRELAY_LOG_LEVEL") {
            self.log_level = v;
        }
    }

    /// Parse a TOML string into config (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// The bot token, or the fatal startup error.
    pub fn require_token(&self) -> Result<&str, AdapterError> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(AdapterError::MissingToken)
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Whether webhook mode is selected (a non-empty webhook base URL).
    pub fn webhook_base(&self) -> Option<&str> {
        self.webhook.as_deref().filter(|w| !w.is_empty())
    }
}
