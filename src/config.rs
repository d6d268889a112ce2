use crate::model::AuthHeaders;
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use thiserror::Error;

pub const ACCESS_TOKEN_ENV: &str = "VINTED_ACCESS_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_brands_path")]
    pub brands_path: String,
    #[serde(default = "default_sold_items_path")]
    pub sold_items_path: String,
    #[serde(default = "default_page_timeout_seconds")]
    pub page_timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default)]
    pub jitter_ms: u64,
    #[serde(default)]
    pub max_pages: Option<u32>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            brands_path: default_brands_path(),
            sold_items_path: default_sold_items_path(),
            page_timeout_seconds: default_page_timeout_seconds(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            jitter_ms: 0,
            max_pages: None,
        }
    }
}

impl ApiConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_seconds)
    }
}

fn default_base_url() -> String {
    "https://www.vinted.fr".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) MarketScout/0.1".to_string()
}

fn default_brands_path() -> String {
    "/api/v2/brands".to_string()
}

fn default_sold_items_path() -> String {
    "/api/v2/item_upload/items/similar_sold_items".to_string()
}

fn default_page_timeout_seconds() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductConfig {
    pub product_name: String,
    pub catalog_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub taxonomy_path: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth_headers: AuthHeaders,
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

fn default_database_path() -> String {
    "data.db".to_string()
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
        apply_access_token(&mut config, &token);
    }
    Ok(config)
}

pub fn parse_config(json: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(json)?;
    if config.api.page_timeout_seconds == 0 {
        return Err(ConfigError::Invalid {
            field: "api.page_timeout_seconds",
            reason: "must be greater than zero".into(),
        });
    }
    if config.api.max_pages == Some(0) {
        return Err(ConfigError::Invalid {
            field: "api.max_pages",
            reason: "must be at least 1 when set".into(),
        });
    }
    Ok(config)
}

/// Adds a bearer token unless the config already carries an authorization header.
pub fn apply_access_token(config: &mut AppConfig, token: &str) {
    let token = token.trim();
    if token.is_empty()
        || config
            .auth_headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("authorization"))
    {
        return;
    }
    config
        .auth_headers
        .insert("authorization".to_string(), format!("Bearer {token}"));
}
