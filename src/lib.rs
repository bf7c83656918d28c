//! Client library for the cafe loyalty platform: menu with TTL cache,
//! promotions digest, purchase history, the admin events editor, Telegram
//! Mini-App bridge and a Gemini-backed assistant.

pub mod config;
pub mod dates;
pub mod editor;
pub mod error;
pub mod i18n;
pub mod migration;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
