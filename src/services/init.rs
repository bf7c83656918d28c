//! Composition root: builds every service once from `Config` and hands them
//! to the console commands.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::config::{Config, ConfigError, MenuConfig};
use crate::editor::EventsEditor;
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::services::ai::AiAssistant;
use crate::services::api::ApiClient;
use crate::services::content::PublicContentClient;
use crate::services::events::AdminEventsClient;
use crate::services::menu::{HttpMenuSource, MenuService};
use crate::services::purchases::PurchaseHistoryClient;
use crate::services::telegram::{verify_init_data, InitDataHost, MiniAppHost, TelegramBridge};

pub struct AppContext {
    pub config: Config,
    pub api: ApiClient,
    pub menu: MenuService,
    pub content: PublicContentClient,
    pub purchases: PurchaseHistoryClient,
    pub ai: AiAssistant,
    pub telegram: TelegramBridge,
}

impl AppContext {
    /// Wires services from configuration. `host` is the Mini-App control
    /// surface when running inside Telegram.
    pub fn build(config: Config, host: Option<Arc<dyn MiniAppHost>>) -> AppResult<Self> {
        let api = ApiClient::new(&config.api)?;
        tracing::info!("Cafe API at {}", api.base_url());

        let menu = MenuService::with_ttl(
            Arc::new(HttpMenuSource::new(api.clone())),
            menu_ttl(&config.menu),
        );

        let ai = AiAssistant::from_config(
            &config.ai,
            Duration::from_secs(config.api.timeout_seconds),
            &config.lang,
        )?;

        Ok(Self {
            content: PublicContentClient::new(api.clone()),
            purchases: PurchaseHistoryClient::new(api.clone()),
            telegram: TelegramBridge::detect(host),
            menu,
            ai,
            api,
            config,
        })
    }

    /// Admin client; requires `ADMIN_TOKEN`.
    pub fn admin_events(&self) -> AppResult<AdminEventsClient> {
        let token = self
            .config
            .api
            .admin_token
            .clone()
            .ok_or_else(|| ConfigError::MissingEnv("ADMIN_TOKEN".to_string()))?;
        Ok(AdminEventsClient::new(self.api.clone(), token))
    }

    pub fn events_editor(&self) -> AppResult<EventsEditor> {
        let client = self.admin_events()?;
        Ok(EventsEditor::new(Arc::new(client), &self.config.lang))
    }
}

fn menu_ttl(config: &MenuConfig) -> Duration {
    Duration::from_secs(config.cache_ttl_minutes.saturating_mul(60))
}

/// Verifies `initData` with the configured bot token and wraps it into a
/// headless host.
pub fn host_from_init_data(config: &Config, init_data: &str) -> AppResult<Arc<InitDataHost>> {
    let bot_token = config
        .telegram
        .bot_token
        .as_deref()
        .ok_or_else(|| ConfigError::MissingEnv("TELEGRAM_BOT_TOKEN".to_string()))?;

    let max_age = chrono::Duration::seconds(config.telegram.init_data_max_age_seconds);
    let init = verify_init_data(init_data, bot_token, max_age, Utc::now()).map_err(|e| {
        let reason = e.to_string();
        AppError::Validation(i18n::tr(
            Some(&config.lang),
            "telegram.invalid_init_data",
            Some(&[("reason", reason.as_str())]),
        ))
    })?;

    if let Some(user) = &init.user {
        tracing::info!("Telegram user {} ({})", user.id, user.display_name());
    }
    Ok(Arc::new(InitDataHost::new(init)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::telegram::sign_init_data;

    #[test]
    fn build_without_optional_credentials() {
        let ctx = AppContext::build(Config::default(), None).unwrap();
        assert!(!ctx.ai.is_configured());
        assert!(!ctx.telegram.is_available());

        let err = ctx.admin_events().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("ADMIN_TOKEN"));
    }

    #[test]
    fn menu_ttl_saturates() {
        assert_eq!(
            menu_ttl(&MenuConfig { cache_ttl_minutes: 30 }),
            Duration::from_secs(1800)
        );
        assert_eq!(
            menu_ttl(&MenuConfig { cache_ttl_minutes: u64::MAX }),
            Duration::from_secs(u64::MAX)
        );

        let mut config = Config::default();
        config.menu.cache_ttl_minutes = u64::MAX;
        assert!(AppContext::build(config, None).is_ok());
    }

    #[test]
    fn admin_client_with_token() {
        let mut config = Config::default();
        config.api.admin_token = Some("secret".to_string());
        config.ai.api_key = Some("key".to_string());

        let ctx = AppContext::build(config, None).unwrap();
        assert!(ctx.ai.is_configured());
        assert!(ctx.events_editor().is_ok());
    }

    #[test]
    fn init_data_host_requires_bot_token_and_valid_signature() {
        let mut config = Config::default();
        let auth_date = Utc::now().timestamp().to_string();
        let init = sign_init_data(
            &[("auth_date", auth_date.as_str()), ("user", r#"{"id":5,"first_name":"Ivan"}"#)],
            "bot-token",
        )
        .unwrap();

        assert!(matches!(host_from_init_data(&config, &init), Err(e) if e.is_config()));

        config.telegram.bot_token = Some("other-token".to_string());
        assert!(matches!(
            host_from_init_data(&config, &init),
            Err(AppError::Validation(_))
        ));

        config.telegram.bot_token = Some("bot-token".to_string());
        let host = host_from_init_data(&config, &init).unwrap();
        let bridge = TelegramBridge::detect(Some(host.clone()));
        assert_eq!(bridge.user().map(|u| u.id), Some(5));
        assert!(host.snapshot().ready);
    }
}
