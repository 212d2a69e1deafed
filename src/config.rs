//! Configuration loading from TOML with environment variable resolution.
//!
//! `config.toml` is optional: every field has a default, so the bot runs
//! with nothing but the credentials below set in the environment.
//! Secrets are never read from the file; they come from `std::env` (or a
//! `.env` file loaded by `main`).

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::types::{PipelineError, ProviderKind};

pub const ENV_MASTODON_BASE_URL: &str = "MASTODON_BASE_URL";
pub const ENV_MASTODON_TOKEN: &str = "MASTODON_TOKEN";
pub const ENV_REDIS_URL: &str = "REDIS_URL";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub assets: AssetsConfig,
    pub freshness: FreshnessConfig,
    pub publish: PublishConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BotConfig {
    /// Prefix of every cache key.
    pub namespace: String,
    /// Credit line drawn in the image footer.
    pub attribution: String,
    /// Regular-season games per team.
    pub season_games: u32,
    /// IANA zone used for the "Updated" label.
    pub timezone: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            namespace: "hockey-bot-odds".to_string(),
            attribution: "@hockeybot@botsin.space".to_string(),
            season_games: 82,
            timezone: "America/New_York".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory holding `GothicA1-Black.ttf` and `GothicA1-Regular.ttf`.
    pub fonts_dir: String,
    /// Directory holding `<ABBR>_light.png` crests.
    pub crests_dir: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            fonts_dir: "assets/fonts".to_string(),
            crests_dir: "assets/images/team_logos".to_string(),
        }
    }
}

/// Freshness windows, in whole days, for one provider.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct FreshnessWindow {
    pub team_days: i64,
    pub league_days: i64,
}

impl Default for FreshnessWindow {
    fn default() -> Self {
        Self {
            team_days: 2,
            league_days: 7,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FreshnessConfig {
    pub moneypuck: FreshnessWindow,
    pub sportsclubstats: FreshnessWindow,
}

impl FreshnessConfig {
    pub fn window(&self, provider: ProviderKind) -> FreshnessWindow {
        match provider {
            ProviderKind::MoneyPuck => self.moneypuck,
            ProviderKind::SportsClubStats => self.sportsclubstats,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PublishConfig {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    /// HTTP timeout for Mastodon requests.
    pub timeout_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 1000,
            timeout_secs: 60,
        }
    }
}

impl PublishConfig {
    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CacheConfig {
    /// Use a JSON file instead of Redis when set.
    pub path: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String, PipelineError> {
        std::env::var(env_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| PipelineError::ConfigurationMissing(env_name.to_string()))
    }
}

/// Mastodon credentials.
#[derive(Debug, Clone)]
pub struct MastodonCredentials {
    pub base_url: String,
    pub token: SecretString,
}

impl MastodonCredentials {
    pub fn from_env() -> Result<Self, PipelineError> {
        let base_url = AppConfig::resolve_env(ENV_MASTODON_BASE_URL)?;
        let token = AppConfig::resolve_env(ENV_MASTODON_TOKEN)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: SecretString::new(token),
        })
    }
}
