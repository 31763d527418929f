use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL
    pub postgres_url: String,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Abandon (and roll back) a request after this many seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
}

fn default_ttl_hours() -> i64 {
    24
}

/// Referral bonus amounts. Zero disables that bonus class.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RewardsConfig {
    /// Credited to the referrer when a referee registers or links
    pub referral_bonus: u32,
    /// Credited to the referee for having a referrer
    pub referee_bonus: u32,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            referral_bonus: 100,
            referee_bonus: 50,
        }
    }
}

impl AppConfig {
    /// Load `config/{env}.yaml` and apply environment overrides
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config yaml")
    }

    /// Override from `DATABASE_URL`, `JWT_SECRET`, `HTTP_PORT`,
    /// `REFERRAL_BONUS` and `REFEREE_BONUS`. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = get("DATABASE_URL") {
            self.postgres_url = url;
        }
        if let Some(secret) = get("JWT_SECRET") {
            self.jwt.secret = secret;
        }
        if let Some(port) = get("HTTP_PORT") {
            self.gateway.port = port
                .parse()
                .with_context(|| format!("invalid HTTP_PORT: {}", port))?;
        }
        if let Some(bonus) = get("REFERRAL_BONUS") {
            self.rewards.referral_bonus = bonus
                .parse()
                .with_context(|| format!("invalid REFERRAL_BONUS: {}", bonus))?;
        }
        if let Some(bonus) = get("REFEREE_BONUS") {
            self.rewards.referee_bonus = bonus
                .parse()
                .with_context(|| format!("invalid REFEREE_BONUS: {}", bonus))?;
        }
        Ok(())
    }
}
