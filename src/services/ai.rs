use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::AiConfig;
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::models::{Event, MenuData};

// ============================================================================
// Conversation types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Text generation backend.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(
        &self,
        system_instruction: Option<&str>,
        contents: &[ChatTurn],
    ) -> AppResult<String>;
}

// ============================================================================
// Gemini REST client
// ============================================================================

/// Calls `{base_url}/{model}:generateContent`.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    lang: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: &str) -> Self {
        Self::with_client(Client::new(), api_key, model, base_url)
    }

    pub fn with_client(
        client: Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            lang: i18n::DEFAULT_LANG.to_string(),
        }
    }

    /// Language of the errors this client produces itself.
    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = lang.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(
        &self,
        system_instruction: Option<&str>,
        contents: &[ChatTurn],
    ) -> AppResult<String> {
        let body = GenerateContentRequest {
            contents: contents
                .iter()
                .map(|turn| Content {
                    role: Some(turn.role),
                    parts: vec![Part {
                        text: turn.text.clone(),
                    }],
                })
                .collect(),
            system_instruction: system_instruction.map(|text| Content {
                role: None,
                parts: vec![Part {
                    text: text.to_string(),
                }],
            }),
        };

        tracing::debug!("Gemini request: model={} turns={}", self.model, contents.len());

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini request failed: {}", e);
                AppError::Request(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse Gemini response: {}", e)))?;

        extract_text_response(parsed, &self.lang)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ProviderErrorBody,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse, lang: &str) -> AppResult<String> {
    let text: String = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AppError::Provider(i18n::tr(Some(lang), "ai.empty_reply", None)));
    }
    Ok(text)
}

fn map_http_error(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    tracing::warn!("Gemini responded with {}: {}", status, message);
    AppError::Provider(format!("{} {}", status.as_u16(), message))
}

// ============================================================================
// Assistant
// ============================================================================

/// A reward the guest can redeem with loyalty points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardOption {
    pub name: String,
    pub points_cost: i64,
}

/// Prompt templates and chat sessions on top of a `GenerativeModel`.
///
/// Without a model every call fails with `AppError::Config` before any
/// request is made.
pub struct AiAssistant {
    model: Option<Arc<dyn GenerativeModel>>,
    sessions: RwLock<HashMap<String, Vec<ChatTurn>>>,
    lang: String,
}

impl AiAssistant {
    pub fn from_config(config: &AiConfig, timeout: Duration, lang: &str) -> AppResult<Self> {
        let Some(api_key) = config.api_key.clone() else {
            tracing::info!("GEMINI_API_KEY not set, AI assistant disabled");
            return Ok(Self::unconfigured(lang));
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;
        let gemini = GeminiClient::with_client(client, api_key, &config.model, &config.base_url)
            .with_lang(lang);
        tracing::info!("AI assistant using model {}", gemini.model());

        Ok(Self::with_model(Arc::new(gemini), lang))
    }

    pub fn with_model(model: Arc<dyn GenerativeModel>, lang: &str) -> Self {
        Self {
            model: Some(model),
            sessions: RwLock::new(HashMap::new()),
            lang: lang.to_string(),
        }
    }

    pub fn unconfigured(lang: &str) -> Self {
        Self {
            model: None,
            sessions: RwLock::new(HashMap::new()),
            lang: lang.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    fn model(&self) -> AppResult<&Arc<dyn GenerativeModel>> {
        self.model.as_ref().ok_or_else(|| {
            AppError::Config(i18n::tr(Some(&self.lang), "ai.not_configured", None))
        })
    }

    fn system_prompt(&self) -> String {
        let language = if self.lang == "en" { "English" } else { "Russian" };
        format!(
            "You are a friendly assistant of a cozy cafe. Answer briefly and in {}.",
            language
        )
    }

    /// One-shot generation from a free-form prompt.
    pub async fn generate_text(&self, prompt: &str) -> AppResult<String> {
        let model = self.model()?;
        let system = self.system_prompt();
        model
            .generate(Some(&system), &[ChatTurn::user(prompt)])
            .await
    }

    pub async fn suggest_menu_items(&self, preferences: &str, menu: &MenuData) -> AppResult<String> {
        self.generate_text(&menu_suggestion_prompt(preferences, menu))
            .await
    }

    pub async fn describe_event(&self, event: &Event) -> AppResult<String> {
        let prompt = format!(
            "Write a short inviting description (2-3 sentences) for this event.\n{}",
            event_summary(event, &self.lang)
        );
        self.generate_text(&prompt).await
    }

    pub async fn promotion_text(&self, event: &Event) -> AppResult<String> {
        let prompt = format!(
            "Write a catchy one-paragraph promotional message for a Telegram channel \
             announcing this event. Use at most two emoji.\n{}",
            event_summary(event, &self.lang)
        );
        self.generate_text(&prompt).await
    }

    pub async fn recommend_reward(&self, points: i64, rewards: &[RewardOption]) -> AppResult<String> {
        let mut prompt = format!(
            "The guest has {} loyalty points. Recommend one reward they can afford \
             and explain the choice in one sentence. If none is affordable, say how \
             many points are missing for the cheapest one.\nRewards:\n",
            points
        );
        for reward in rewards {
            prompt.push_str(&format!("- {} ({} points)\n", reward.name, reward.points_cost));
        }
        self.generate_text(&prompt).await
    }

    // ========================================================================
    // Chat sessions
    // ========================================================================

    /// Starts a session with empty history, replacing any existing one.
    pub async fn start_chat(&self, session_id: &str) -> AppResult<()> {
        self.model()?;
        let replaced = self
            .sessions
            .write()
            .await
            .insert(session_id.to_string(), Vec::new())
            .is_some();
        tracing::debug!("Chat session {} started (replaced: {})", session_id, replaced);
        Ok(())
    }

    /// Sends a message, creating the session on first use. History is only
    /// extended when the model replies.
    pub async fn send_chat_message(&self, session_id: &str, message: &str) -> AppResult<String> {
        let model = self.model()?;

        let mut contents = {
            let mut sessions = self.sessions.write().await;
            sessions.entry(session_id.to_string()).or_default().clone()
        };
        contents.push(ChatTurn::user(message));

        let system = self.system_prompt();
        let reply = model.generate(Some(&system), &contents).await?;

        let mut sessions = self.sessions.write().await;
        let history = sessions.entry(session_id.to_string()).or_default();
        history.push(ChatTurn::user(message));
        history.push(ChatTurn::model(reply.clone()));

        Ok(reply)
    }

    pub async fn end_chat(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn chat_history(&self, session_id: &str) -> Option<Vec<ChatTurn>> {
        self.sessions.read().await.get(session_id).cloned()
    }
}

fn menu_suggestion_prompt(preferences: &str, menu: &MenuData) -> String {
    let mut prompt = format!(
        "Guest preferences: {}\nSuggest up to three items from the menu below and \
         explain each pick in one sentence. Only suggest items that are listed.\n\nMenu:\n",
        preferences.trim()
    );

    for item in menu.items.iter().filter(|i| i.is_available) {
        prompt.push_str(&format!("- {} ({:.0})", item.name, item.price));
        if let Some(desc) = item.description.as_deref().filter(|d| !d.is_empty()) {
            prompt.push_str(&format!(": {}", desc));
        }
        prompt.push('\n');
    }
    prompt
}

fn event_summary(event: &Event, lang: &str) -> String {
    let mut summary = format!(
        "Title: {}\nType: {}\nDate: {} {}\n",
        event.performer,
        event.type_label(lang),
        crate::dates::format_display(event.date),
        event.time_label()
    );
    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        summary.push_str(&format!("Location: {}\n", location));
    }
    if let Some(desc) = event.description.as_deref().filter(|d| !d.is_empty()) {
        summary.push_str(&format!("Details: {}\n", desc));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::models::{EventType, MenuItem};

    /// Records every call and replies with a fixed text or error.
    #[derive(Default)]
    struct MockModel {
        calls: Mutex<Vec<Vec<ChatTurn>>>,
        fail: bool,
    }

    #[async_trait]
    impl GenerativeModel for MockModel {
        async fn generate(
            &self,
            _system_instruction: Option<&str>,
            contents: &[ChatTurn],
        ) -> AppResult<String> {
            self.calls.lock().unwrap().push(contents.to_vec());
            if self.fail {
                return Err(AppError::Provider("quota exceeded".to_string()));
            }
            Ok(format!("reply #{}", self.calls.lock().unwrap().len()))
        }
    }

    fn menu() -> MenuData {
        MenuData {
            branch_id: "1".to_string(),
            categories: Vec::new(),
            items: vec![
                MenuItem {
                    id: "1".to_string(),
                    name: "Flat white".to_string(),
                    description: Some("double ristretto".to_string()),
                    price: 250.0,
                    category_id: None,
                    image_url: None,
                    is_available: true,
                },
                MenuItem {
                    id: "2".to_string(),
                    name: "Sold out cake".to_string(),
                    description: None,
                    price: 300.0,
                    category_id: None,
                    image_url: None,
                    is_available: false,
                },
            ],
        }
    }

    #[tokio::test]
    async fn unconfigured_assistant_never_calls_provider() {
        let ai = AiAssistant::unconfigured("en");
        assert!(!ai.is_configured());
        assert!(matches!(ai.generate_text("hi").await, Err(AppError::Config(_))));
        assert!(matches!(
            ai.send_chat_message("s1", "hi").await,
            Err(AppError::Config(_))
        ));
        assert!(matches!(ai.start_chat("s1").await, Err(AppError::Config(_))));
        assert_eq!(ai.chat_history("s1").await, None);
    }

    #[tokio::test]
    async fn unknown_session_is_created_on_first_message() {
        let model = Arc::new(MockModel::default());
        let ai = AiAssistant::with_model(model.clone(), "ru");

        let reply = ai.send_chat_message("guest-1", "Привет").await.unwrap();
        assert_eq!(reply, "reply #1");
        ai.send_chat_message("guest-1", "Что посоветуешь?").await.unwrap();

        let history = ai.chat_history("guest-1").await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[1], ChatTurn::model("reply #1"));

        // Second call carries the previous exchange.
        let calls = model.calls.lock().unwrap();
        assert_eq!(calls[1].len(), 3);
        assert_eq!(calls[1][2], ChatTurn::user("Что посоветуешь?"));
    }

    #[tokio::test]
    async fn start_chat_replaces_history_and_end_chat_removes_it() {
        let ai = AiAssistant::with_model(Arc::new(MockModel::default()), "en");
        ai.send_chat_message("s", "one").await.unwrap();
        ai.start_chat("s").await.unwrap();
        assert_eq!(ai.chat_history("s").await, Some(Vec::new()));

        assert!(ai.end_chat("s").await);
        assert!(!ai.end_chat("s").await);
        assert_eq!(ai.chat_history("s").await, None);
    }

    #[tokio::test]
    async fn failed_reply_leaves_history_untouched() {
        let model = Arc::new(MockModel {
            fail: true,
            ..Default::default()
        });
        let ai = AiAssistant::with_model(model, "en");
        ai.start_chat("s").await.unwrap();

        let err = ai.send_chat_message("s", "hi").await.unwrap_err();
        assert!(matches!(err, AppError::Provider(msg) if msg == "quota exceeded"));
        assert_eq!(ai.chat_history("s").await, Some(Vec::new()));
    }

    #[tokio::test]
    async fn prompt_builders_include_context() {
        let model = Arc::new(MockModel::default());
        let ai = AiAssistant::with_model(model.clone(), "en");

        ai.suggest_menu_items("something warm", &menu()).await.unwrap();
        let event: Event = serde_json::from_value(serde_json::json!({
            "id": 1, "date": "2024-12-15", "performer": "Jazz Trio",
            "time": "19:30", "type": "live_music", "location": "Main hall"
        }))
        .unwrap();
        ai.promotion_text(&event).await.unwrap();
        ai.recommend_reward(
            120,
            &[RewardOption {
                name: "Free espresso".to_string(),
                points_cost: 100,
            }],
        )
        .await
        .unwrap();

        let calls = model.calls.lock().unwrap();
        let menu_prompt = &calls[0][0].text;
        assert!(menu_prompt.contains("something warm"));
        assert!(menu_prompt.contains("Flat white (250): double ristretto"));
        assert!(!menu_prompt.contains("Sold out cake"));

        let promo_prompt = &calls[1][0].text;
        assert!(promo_prompt.contains("Jazz Trio"));
        assert!(promo_prompt.contains("15/12/2024 19:30"));
        assert!(promo_prompt.contains(&EventType::LiveMusic.label("en")));

        assert!(calls[2][0].text.contains("Free espresso (100 points)"));
    }

    #[test]
    fn extracts_text_across_parts() {
        let parsed: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello " }, { "text": "there" }] } }]
        }))
        .unwrap();
        assert_eq!(extract_text_response(parsed, "en").unwrap(), "Hello there");
    }

    #[test]
    fn empty_reply_error_follows_language() {
        let empty = || -> GenerateContentResponse {
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap()
        };
        assert!(matches!(
            extract_text_response(empty(), "en"),
            Err(AppError::Provider(msg)) if msg == "empty model reply"
        ));
        assert!(matches!(
            extract_text_response(empty(), "ru"),
            Err(AppError::Provider(msg)) if msg == "пустой ответ модели"
        ));
    }

    #[test]
    fn http_error_keeps_provider_message() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(matches!(err, AppError::Provider(msg) if msg == "429 RESOURCE_EXHAUSTED: Quota exceeded"));
    }
}
