use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub type ButtonCallback = Arc<dyn Fn() + Send + Sync>;

/// Mini-App user as Telegram puts it into `initData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppUser {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl WebAppUser {
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// Control surface offered by the Telegram client hosting the Mini-App.
pub trait MiniAppHost: Send + Sync {
    fn ready(&self);
    fn expand(&self);
    fn user(&self) -> Option<WebAppUser>;
    fn phone_number(&self) -> Option<String>;
    fn show_main_button(&self, text: &str, on_click: ButtonCallback);
    fn hide_main_button(&self);
    fn show_back_button(&self, on_click: ButtonCallback);
    fn hide_back_button(&self);
    fn close(&self);
    fn set_header_color(&self, color: &str);
    fn set_background_color(&self, color: &str);
}

// ============================================================================
// Bridge
// ============================================================================

/// Single entry point to the Mini-App host.
///
/// Built once by the composition root. Without a host every call is a no-op
/// and reads return `None`, so callers never check availability themselves.
#[derive(Clone)]
pub struct TelegramBridge {
    host: Option<Arc<dyn MiniAppHost>>,
}

impl TelegramBridge {
    pub fn detect(host: Option<Arc<dyn MiniAppHost>>) -> Self {
        match &host {
            Some(h) => {
                h.ready();
                h.expand();
                tracing::info!("Telegram Mini-App host detected");
            }
            None => tracing::debug!("No Telegram Mini-App host, bridge disabled"),
        }
        Self { host }
    }

    pub fn unavailable() -> Self {
        Self { host: None }
    }

    pub fn is_available(&self) -> bool {
        self.host.is_some()
    }

    pub fn user(&self) -> Option<WebAppUser> {
        self.host.as_ref().and_then(|h| h.user())
    }

    pub fn phone_number(&self) -> Option<String> {
        self.host.as_ref().and_then(|h| h.phone_number())
    }

    pub fn show_main_button(&self, text: &str, on_click: ButtonCallback) {
        if let Some(h) = &self.host {
            h.show_main_button(text, on_click);
        }
    }

    pub fn hide_main_button(&self) {
        if let Some(h) = &self.host {
            h.hide_main_button();
        }
    }

    pub fn show_back_button(&self, on_click: ButtonCallback) {
        if let Some(h) = &self.host {
            h.show_back_button(on_click);
        }
    }

    pub fn hide_back_button(&self) {
        if let Some(h) = &self.host {
            h.hide_back_button();
        }
    }

    pub fn close(&self) {
        if let Some(h) = &self.host {
            h.close();
        }
    }

    pub fn set_theme_colors(&self, header: &str, background: &str) {
        if let Some(h) = &self.host {
            h.set_header_color(header);
            h.set_background_color(background);
        }
    }
}

// ============================================================================
// Init data verification
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitDataError {
    #[error("missing hash")]
    MissingHash,
    #[error("missing auth_date")]
    MissingAuthDate,
    #[error("invalid auth_date")]
    InvalidAuthDate,
    #[error("signature mismatch")]
    BadSignature,
    #[error("init data is too old ({age_seconds}s)")]
    Expired { age_seconds: i64 },
    #[error("auth_date is {ahead_seconds}s in the future")]
    FromFuture { ahead_seconds: i64 },
    #[error("invalid user payload: {0}")]
    InvalidUser(String),
}

/// Verified `initData` contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitData {
    pub user: Option<WebAppUser>,
    pub auth_date: DateTime<Utc>,
    pub query_id: Option<String>,
    pub start_param: Option<String>,
}

/// Tolerated drift between Telegram's clock and ours.
pub const CLOCK_SKEW_SECONDS: i64 = 300;

fn signing_key(bot_token: &str) -> Result<Vec<u8>, InitDataError> {
    let mut mac =
        HmacSha256::new_from_slice(b"WebAppData").map_err(|_| InitDataError::BadSignature)?;
    mac.update(bot_token.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// `key=value` lines sorted by key, `hash` excluded.
fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .filter(|(k, _)| k.as_str() != "hash")
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<String>>()
        .join("\n")
}

/// Verify Mini-App init data according to Telegram's docs:
/// https://core.telegram.org/bots/webapps#validating-data-received-via-the-mini-app
///
/// The secret is `HMAC_SHA256("WebAppData", bot_token)`; the payload hash is
/// `HMAC_SHA256(secret, data_check_string)` in hex. Data older than `max_age`
/// relative to `now`, or dated more than `CLOCK_SKEW_SECONDS` ahead of it, is
/// rejected.
pub fn verify_init_data(
    init_data: &str,
    bot_token: &str,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Result<InitData, InitDataError> {
    let fields: BTreeMap<String, String> = url::form_urlencoded::parse(init_data.trim().as_bytes())
        .into_owned()
        .collect();

    let received_hash = fields.get("hash").ok_or(InitDataError::MissingHash)?;
    let expected = hex::decode(received_hash).map_err(|_| InitDataError::BadSignature)?;

    let mut mac = HmacSha256::new_from_slice(&signing_key(bot_token)?)
        .map_err(|_| InitDataError::BadSignature)?;
    mac.update(data_check_string(&fields).as_bytes());
    if mac.verify_slice(&expected).is_err() {
        tracing::warn!("Telegram init data signature mismatch");
        return Err(InitDataError::BadSignature);
    }

    let auth_date = fields
        .get("auth_date")
        .ok_or(InitDataError::MissingAuthDate)?
        .parse::<i64>()
        .ok()
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .ok_or(InitDataError::InvalidAuthDate)?;

    let age = now - auth_date;
    if age < -Duration::seconds(CLOCK_SKEW_SECONDS) {
        return Err(InitDataError::FromFuture {
            ahead_seconds: -age.num_seconds(),
        });
    }
    if age > max_age {
        return Err(InitDataError::Expired {
            age_seconds: age.num_seconds(),
        });
    }

    let user = fields
        .get("user")
        .map(|raw| serde_json::from_str::<WebAppUser>(raw))
        .transpose()
        .map_err(|e| InitDataError::InvalidUser(e.to_string()))?;

    Ok(InitData {
        user,
        auth_date,
        query_id: fields.get("query_id").cloned(),
        start_param: fields.get("start_param").cloned(),
    })
}

/// Signs `fields` the way Telegram does and returns a full `initData` string.
/// Used by tests and local tooling that needs to fake a Mini-App launch.
pub fn sign_init_data(fields: &[(&str, &str)], bot_token: &str) -> Result<String, InitDataError> {
    let map: BTreeMap<String, String> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let mut mac = HmacSha256::new_from_slice(&signing_key(bot_token)?)
        .map_err(|_| InitDataError::BadSignature)?;
    mac.update(data_check_string(&map).as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in &map {
        serializer.append_pair(k, v);
    }
    serializer.append_pair("hash", &hash);
    Ok(serializer.finish())
}

// ============================================================================
// Headless host
// ============================================================================

/// Host state as last set through the bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSnapshot {
    pub ready: bool,
    pub expanded: bool,
    pub main_button: Option<String>,
    pub back_button_visible: bool,
    pub closed: bool,
    pub header_color: Option<String>,
    pub background_color: Option<String>,
}

#[derive(Default)]
struct HostState {
    snapshot: HostSnapshot,
    main_callback: Option<ButtonCallback>,
    back_callback: Option<ButtonCallback>,
}

/// Host backed by verified init data, for running outside a Telegram client
/// (console, tests). UI calls only update the recorded state.
pub struct InitDataHost {
    init: InitData,
    phone: Option<String>,
    state: Mutex<HostState>,
}

impl InitDataHost {
    pub fn new(init: InitData) -> Self {
        Self {
            init,
            phone: None,
            state: Mutex::new(HostState::default()),
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn init_data(&self) -> &InitData {
        &self.init
    }

    pub fn snapshot(&self) -> HostSnapshot {
        self.lock().snapshot.clone()
    }

    /// Invokes the main button callback. Returns false when the button is hidden.
    pub fn click_main_button(&self) -> bool {
        let callback = self.lock().main_callback.clone();
        callback.map(|cb| cb()).is_some()
    }

    pub fn click_back_button(&self) -> bool {
        let callback = self.lock().back_callback.clone();
        callback.map(|cb| cb()).is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MiniAppHost for InitDataHost {
    fn ready(&self) {
        self.lock().snapshot.ready = true;
    }

    fn expand(&self) {
        self.lock().snapshot.expanded = true;
    }

    fn user(&self) -> Option<WebAppUser> {
        self.init.user.clone()
    }

    fn phone_number(&self) -> Option<String> {
        self.phone.clone()
    }

    fn show_main_button(&self, text: &str, on_click: ButtonCallback) {
        tracing::debug!("Main button shown: {}", text);
        let mut state = self.lock();
        state.snapshot.main_button = Some(text.to_string());
        state.main_callback = Some(on_click);
    }

    fn hide_main_button(&self) {
        let mut state = self.lock();
        state.snapshot.main_button = None;
        state.main_callback = None;
    }

    fn show_back_button(&self, on_click: ButtonCallback) {
        let mut state = self.lock();
        state.snapshot.back_button_visible = true;
        state.back_callback = Some(on_click);
    }

    fn hide_back_button(&self) {
        let mut state = self.lock();
        state.snapshot.back_button_visible = false;
        state.back_callback = None;
    }

    fn close(&self) {
        tracing::info!("Mini-App close requested");
        self.lock().snapshot.closed = true;
    }

    fn set_header_color(&self, color: &str) {
        self.lock().snapshot.header_color = Some(color.to_string());
    }

    fn set_background_color(&self, color: &str) {
        self.lock().snapshot.background_color = Some(color.to_string());
    }
}
