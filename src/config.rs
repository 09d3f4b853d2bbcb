use crate::error::AppError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "app.db";
pub const DEFAULT_PRICE_API_BASE_URL: &str = "https://api.binance.com";
pub const DEFAULT_PRICE_API_TIMEOUT_MS: u64 = 4_000;
pub const MIN_PRICE_API_TIMEOUT_MS: u64 = 500;
pub const MAX_PRICE_API_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_AUTH_API_TIMEOUT_MS: u64 = 4_000;
pub const DEFAULT_LOG_FILTER: &str = "info,tradedesk_client_lib=debug";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub db_path: PathBuf,
    pub price_api_base_url: String,
    pub price_api_timeout: Duration,
    pub auth_api_base_url: Option<String>,
    pub auth_api_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            price_api_base_url: DEFAULT_PRICE_API_BASE_URL.to_string(),
            price_api_timeout: Duration::from_millis(DEFAULT_PRICE_API_TIMEOUT_MS),
            auth_api_base_url: None,
            auth_api_timeout: Duration::from_millis(DEFAULT_AUTH_API_TIMEOUT_MS),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn normalize_base_url(name: &str, raw: String) -> Result<String, AppError> {
    let trimmed = raw.trim_end_matches('/').to_string();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(AppError::Config(format!(
            "{name} must be an http(s) url, got {trimmed:?}"
        )));
    }
    Ok(trimmed)
}

fn timeout_ms(name: &str, raw: Option<String>, default_ms: u64) -> Result<Duration, AppError> {
    let timeout_ms = match raw {
        Some(raw) => raw.parse::<u64>().map_err(|_| {
            AppError::Config(format!("{name} must be an integer, got {raw:?}"))
        })?,
        None => default_ms,
    };
    if !(MIN_PRICE_API_TIMEOUT_MS..=MAX_PRICE_API_TIMEOUT_MS).contains(&timeout_ms) {
        return Err(AppError::Config(format!(
            "{name} must be between {MIN_PRICE_API_TIMEOUT_MS} and {MAX_PRICE_API_TIMEOUT_MS}"
        )));
    }
    Ok(Duration::from_millis(timeout_ms))
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the config from any key lookup; empty values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = non_empty(lookup("APP_DB_PATH"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let price_api_base_url = normalize_base_url(
            "PRICE_API_BASE_URL",
            non_empty(lookup("PRICE_API_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_PRICE_API_BASE_URL.to_string()),
        )?;

        let auth_api_base_url = non_empty(lookup("AUTH_API_BASE_URL"))
            .map(|raw| normalize_base_url("AUTH_API_BASE_URL", raw))
            .transpose()?;

        let price_api_timeout = timeout_ms(
            "PRICE_API_TIMEOUT_MS",
            non_empty(lookup("PRICE_API_TIMEOUT_MS")),
            DEFAULT_PRICE_API_TIMEOUT_MS,
        )?;
        let auth_api_timeout = timeout_ms(
            "AUTH_API_TIMEOUT_MS",
            non_empty(lookup("AUTH_API_TIMEOUT_MS")),
            DEFAULT_AUTH_API_TIMEOUT_MS,
        )?;

        Ok(Self {
            db_path,
            price_api_base_url,
            price_api_timeout,
            auth_api_base_url,
            auth_api_timeout,
        })
    }
}
