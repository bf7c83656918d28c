use reqwest::StatusCode;

use crate::i18n;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success response from the cafe API. `message` is the server's
    /// `error`/`message` field when it sent one.
    #[error("API error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Api {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("Invalid response payload: {0}")]
    Parse(String),

    #[error("AI provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Text suitable for showing to a person, in the given language.
    ///
    /// Server-provided messages and validation messages are passed through;
    /// transport and internal failures collapse into a generic localized line.
    pub fn user_message(&self, lang: &str) -> String {
        let lang = Some(lang);
        match self {
            AppError::Unauthorized => i18n::tr(lang, "error.unauthorized", None),
            AppError::NotFound(what) => {
                i18n::tr(lang, "error.not_found", Some(&[("what", what.as_str())]))
            }
            AppError::Validation(msg) => msg.clone(),
            AppError::Config(msg) => {
                i18n::tr(lang, "error.config", Some(&[("details", msg.as_str())]))
            }
            AppError::Api {
                message: Some(msg), ..
            } => msg.clone(),
            AppError::Api { message: None, .. } | AppError::Request(_) => {
                i18n::tr(lang, "error.network", None)
            }
            AppError::Parse(_) => i18n::tr(lang, "error.bad_response", None),
            AppError::Provider(msg) => {
                i18n::tr(lang, "error.ai_provider", Some(&[("details", msg.as_str())]))
            }
            AppError::Database(_) | AppError::Internal(_) => i18n::tr(lang, "error.generic", None),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
