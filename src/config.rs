use std::env;
use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub menu: MenuConfig,
    pub ai: AiConfig,
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    /// Language used for user-facing messages ("ru" or "en").
    pub lang: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the cafe REST API. Always ends with a `/` so that relative
    /// endpoint paths (`menu/1`, `admin/events`) join underneath it.
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Bearer token for `admin/*` endpoints.
    pub admin_token: Option<String>,
    /// Bearer token of the signed-in customer (purchase history).
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuConfig {
    pub cache_ttl_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Gemini API key. When absent the assistant runs unconfigured and every
    /// generation call fails with a configuration error.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token used to verify Mini-App init data signatures.
    pub bot_token: Option<String>,
    pub init_data_max_age_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api/";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            api: ApiConfig {
                base_url: normalize_base_url(
                    &env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
                )?,
                timeout_seconds: parse_var("API_TIMEOUT_SECONDS", 30)?,
                admin_token: non_empty_var("ADMIN_TOKEN"),
                auth_token: non_empty_var("AUTH_TOKEN"),
            },
            menu: MenuConfig {
                cache_ttl_minutes: parse_var("MENU_CACHE_TTL_MINUTES", 30)?,
            },
            ai: AiConfig {
                api_key: non_empty_var("GEMINI_API_KEY"),
                model: env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: env::var("GEMINI_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            },
            telegram: TelegramConfig {
                bot_token: non_empty_var("TELEGRAM_BOT_TOKEN"),
                init_data_max_age_seconds: parse_var("TELEGRAM_INIT_DATA_MAX_AGE_SECONDS", 86400)?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/cafe.db".to_string()),
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 1)?,
            },
            lang: env::var("APP_LANG")
                .map(|v| crate::i18n::normalize_language(&v))
                .unwrap_or_else(|_| crate::i18n::DEFAULT_LANG.to_string()),
        })
    }
}

/// Treats unset and blank variables alike.
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Numeric settings: unset or blank means `default`, anything unparseable is
/// an error.
fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Validates the API base URL and makes sure it ends with a slash.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };

    url::Url::parse(&with_slash)
        .map_err(|_| ConfigError::InvalidValue("API_BASE_URL".to_string()))?;

    Ok(with_slash)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig {
                base_url: DEFAULT_API_BASE_URL.to_string(),
                timeout_seconds: 30,
                admin_token: None,
                auth_token: None,
            },
            menu: MenuConfig {
                cache_ttl_minutes: 30,
            },
            ai: AiConfig {
                api_key: None,
                model: DEFAULT_GEMINI_MODEL.to_string(),
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            },
            telegram: TelegramConfig {
                bot_token: None,
                init_data_max_age_seconds: 86400,
            },
            database: DatabaseConfig {
                url: "sqlite://data/cafe.db".to_string(),
                max_connections: 1,
            },
            lang: crate::i18n::DEFAULT_LANG.to_string(),
        }
    }
}
