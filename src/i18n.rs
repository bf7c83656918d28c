/*
Small i18n helper for the cafe client.

This module provides:
- An embedded translations store for RU/EN (compile-time embedded JSON).
- A `tr` function to look up translations by key + optional params.

Usage:
    use crate::i18n;
    let msg = i18n::tr(None, "validation.date_required", None);
    let msg = i18n::tr(Some("en"), "events.confirm_delete", Some(&[("performer", "Jazz Trio")]));

Notes:
- Placeholders in translation strings use single-brace format: `{name}`.
- Default language is `ru`. If a key is missing for the requested language,
  the default language is used, then the key itself.
*/

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LANG: &str = "ru";

static TRANSLATIONS: OnceLock<HashMap<String, HashMap<String, String>>> = OnceLock::new();

const RU_JSON: &str = r#"
{
  "error.unauthorized": "Требуется вход. Авторизуйтесь и попробуйте снова.",
  "error.not_found": "Не найдено: {what}",
  "error.config": "Сервис не настроен: {details}",
  "error.network": "Не удалось связаться с сервером. Попробуйте позже.",
  "error.bad_response": "Сервер вернул некорректные данные.",
  "error.ai_provider": "Ошибка AI-сервиса: {details}",
  "error.generic": "Что-то пошло не так. Попробуйте позже.",
  "validation.date_required": "Укажите дату",
  "validation.date_invalid": "Неверная дата. Ожидается формат дд/мм/гггг",
  "validation.performer_required": "Укажите исполнителя",
  "validation.time_required": "Укажите время",
  "validation.time_invalid": "Неверное время. Ожидается формат ЧЧ:ММ",
  "validation.custom_type_required": "Укажите название своего типа события",
  "events.created": "Событие создано",
  "events.updated": "Событие обновлено",
  "events.deleted": "Событие удалено",
  "events.save_failed": "Не удалось сохранить событие",
  "events.delete_failed": "Не удалось удалить событие",
  "events.load_failed": "Не удалось загрузить события",
  "events.confirm_delete": "Удалить событие «{performer}»? Это действие нельзя отменить.",
  "events.empty": "Событий пока нет",
  "events.not_found": "событие {id}",
  "menu.empty": "Меню пока пустое",
  "promotions.empty": "Скоро здесь появятся акции и события",
  "promotions.highlighted": "Главное",
  "promotions.upcoming": "Ближайшие события",
  "purchases.empty": "Покупок пока нет",
  "purchases.login_required": "Войдите, чтобы увидеть историю покупок",
  "ai.not_configured": "не задан GEMINI_API_KEY",
  "ai.empty_reply": "пустой ответ модели",
  "event_type.live_music": "Живая музыка",
  "event_type.dj": "DJ-сет",
  "event_type.karaoke": "Караоке",
  "event_type.quiz": "Квиз",
  "event_type.promotion": "Акция",
  "event_type.custom": "Другое",
  "telegram.unavailable": "Приложение открыто вне Telegram",
  "telegram.invalid_init_data": "Данные Telegram не прошли проверку: {reason}"
}
"#;

const EN_JSON: &str = r#"
{
  "error.unauthorized": "Sign-in required. Please log in and try again.",
  "error.not_found": "Not found: {what}",
  "error.config": "Service is not configured: {details}",
  "error.network": "Could not reach the server. Please try again later.",
  "error.bad_response": "The server returned malformed data.",
  "error.ai_provider": "AI service error: {details}",
  "error.generic": "Something went wrong. Please try again later.",
  "validation.date_required": "Date is required",
  "validation.date_invalid": "Invalid date. Expected dd/mm/yyyy",
  "validation.performer_required": "Performer is required",
  "validation.time_required": "Time is required",
  "validation.time_invalid": "Invalid time. Expected HH:MM",
  "validation.custom_type_required": "Custom event type name is required",
  "events.created": "Event created",
  "events.updated": "Event updated",
  "events.deleted": "Event deleted",
  "events.save_failed": "Failed to save event",
  "events.delete_failed": "Failed to delete event",
  "events.load_failed": "Failed to load events",
  "events.confirm_delete": "Delete event \"{performer}\"? This cannot be undone.",
  "events.empty": "No events yet",
  "events.not_found": "event {id}",
  "menu.empty": "The menu is empty for now",
  "promotions.empty": "Promotions and events will appear here soon",
  "promotions.highlighted": "Highlights",
  "promotions.upcoming": "Upcoming events",
  "purchases.empty": "No purchases yet",
  "purchases.login_required": "Log in to see your purchase history",
  "ai.not_configured": "GEMINI_API_KEY is not set",
  "ai.empty_reply": "empty model reply",
  "event_type.live_music": "Live music",
  "event_type.dj": "DJ set",
  "event_type.karaoke": "Karaoke",
  "event_type.quiz": "Quiz",
  "event_type.promotion": "Promotion",
  "event_type.custom": "Other",
  "telegram.unavailable": "The app is running outside Telegram",
  "telegram.invalid_init_data": "Telegram data failed verification: {reason}"
}
"#;

/// Initialize translations map (lazy).
fn build_translations() -> HashMap<String, HashMap<String, String>> {
    let mut out: HashMap<String, HashMap<String, String>> = HashMap::new();

    // Parse RU
    let ru_map: HashMap<String, String> = serde_json::from_str(RU_JSON).unwrap_or_else(|e| {
        panic!("failed to parse RU_JSON in i18n module: {}", e);
    });
    out.insert("ru".to_string(), ru_map);

    // Parse EN
    let en_map: HashMap<String, String> = serde_json::from_str(EN_JSON).unwrap_or_else(|e| {
        panic!("failed to parse EN_JSON in i18n module: {}", e);
    });
    out.insert("en".to_string(), en_map);

    out
}

/// Returns the global translations map (lang -> (key -> message)).
fn translations() -> &'static HashMap<String, HashMap<String, String>> {
    TRANSLATIONS.get_or_init(build_translations)
}

/// Normalize a language tag into a short, lowercase code (e.g. "en-US" -> "en").
///
/// Telegram reports `language_code` in this long form for some clients.
pub fn normalize_language(lang: &str) -> String {
    lang.split('-').next().unwrap_or(lang).to_lowercase()
}

/// Returns true if the given language code has a translation table.
pub fn is_supported_language(lang: &str) -> bool {
    translations().contains_key(lang)
}

/// Translate a key using an explicit language (or default if None).
///
/// - `lang`: optional language code (`"ru"`, `"en"`). If None, DEFAULT_LANG is used.
/// - `key`: flat translation key, e.g. `"validation.date_required"`.
/// - `params`: optional (name, value) pairs replacing `{name}` placeholders.
pub fn tr(lang: Option<&str>, key: &str, params: Option<&[(&str, &str)]>) -> String {
    let map = translations();

    let desired = lang.unwrap_or(DEFAULT_LANG);

    let val = map
        .get(desired)
        .and_then(|m| m.get(key))
        .cloned()
        .or_else(|| map.get(DEFAULT_LANG).and_then(|m| m.get(key)).cloned())
        .unwrap_or_else(|| key.to_string());

    if let Some(params) = params {
        let mut s = val;
        for (k, v) in params {
            s = s.replace(&format!("{{{}}}", k), v);
        }
        s
    } else {
        val
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tr_basic() {
        let s = tr(Some("en"), "validation.date_required", None);
        assert_eq!(s, "Date is required");
    }

    #[test]
    fn test_tr_with_params() {
        let s = tr(None, "events.confirm_delete", Some(&[("performer", "Jazz Trio")]));
        assert!(s.contains("Jazz Trio"));
    }

    #[test]
    fn test_fallback_to_default() {
        let s = tr(Some("fr"), "validation.date_required", None);
        assert_eq!(s, "Укажите дату");
    }

    #[test]
    fn missing_key_returns_key() {
        let k = "non.existent.key";
        assert_eq!(tr(Some("en"), k, None), k.to_string());
    }

    #[test]
    fn tables_have_the_same_keys() {
        let map = translations();
        let mut ru: Vec<_> = map["ru"].keys().collect();
        let mut en: Vec<_> = map["en"].keys().collect();
        ru.sort();
        en.sort();
        assert_eq!(ru, en);
    }

    #[test]
    fn test_is_supported_language() {
        assert!(is_supported_language("ru"));
        assert!(is_supported_language("en"));
        assert!(!is_supported_language("fr"));
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("en-US"), "en");
        assert_eq!(normalize_language("ru"), "ru");
        assert_eq!(normalize_language("EN-us"), "en");
    }
}
