use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::error::{AppError, AppResult};
use crate::models::{Event, EventFilter, EventType, EventsResponse};
use crate::services::api::{read_ack, read_json, ApiClient};

/// Image attached to a create/update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub async fn from_path(path: &Path) -> AppResult<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AppError::Validation(format!("Cannot read image {}: {}", path.display(), e))
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        Ok(Self {
            content_type: content_type_for(&file_name).to_string(),
            file_name,
            bytes,
        })
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Validated create/update request. Built by the events editor form.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    /// `dd/mm/yyyy`
    pub date: String,
    pub month: String,
    pub performer: String,
    /// `HH:MM`
    pub time: String,
    pub event_type: EventType,
    pub custom_type: Option<String>,
    pub is_highlighted: bool,
    pub description: String,
    pub location: String,
    pub is_active: bool,
    pub display_order: i32,
    pub image: Option<ImageUpload>,
}

impl EventPayload {
    /// Text fields in the order the admin endpoint documents them.
    /// `customType` is only sent for custom events.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("date", self.date.clone()),
            ("month", self.month.clone()),
            ("performer", self.performer.clone()),
            ("time", self.time.clone()),
            ("type", self.event_type.as_str().to_string()),
        ];
        if self.event_type == EventType::Custom {
            if let Some(custom) = &self.custom_type {
                fields.push(("customType", custom.clone()));
            }
        }
        fields.extend([
            ("isHighlighted", self.is_highlighted.to_string()),
            ("description", self.description.clone()),
            ("location", self.location.clone()),
            ("isActive", self.is_active.to_string()),
            ("displayOrder", self.display_order.to_string()),
        ]);
        fields
    }

    pub fn into_form(self) -> AppResult<Form> {
        let mut form = Form::new();
        for (name, value) in self.text_fields() {
            form = form.text(name, value);
        }

        if let Some(image) = self.image {
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.content_type)
                .map_err(AppError::Request)?;
            form = form.part("image", part);
        }

        Ok(form)
    }
}

/// Admin CRUD over scheduled events.
#[async_trait]
pub trait EventsApi: Send + Sync {
    async fn list(&self, filter: &EventFilter) -> AppResult<Vec<Event>>;

    async fn create(&self, payload: EventPayload) -> AppResult<()>;

    async fn update(&self, event_id: &str, payload: EventPayload) -> AppResult<()>;

    async fn delete(&self, event_id: &str) -> AppResult<()>;
}

/// `admin/events` endpoints, authenticated with the admin bearer token.
#[derive(Debug, Clone)]
pub struct AdminEventsClient {
    api: ApiClient,
    token: String,
}

impl AdminEventsClient {
    pub fn new(api: ApiClient, token: impl Into<String>) -> Self {
        Self {
            api,
            token: token.into(),
        }
    }
}

#[async_trait]
impl EventsApi for AdminEventsClient {
    async fn list(&self, filter: &EventFilter) -> AppResult<Vec<Event>> {
        let url = self.api.endpoint(&["admin", "events"])?;
        let request = self
            .api
            .http()
            .get(url)
            .bearer_auth(&self.token)
            .query(&filter.query_pairs());

        let body: EventsResponse = read_json(self.api.send(request).await?).await?;
        if !body.success {
            return Err(AppError::Api {
                status: reqwest::StatusCode::OK,
                message: body.error.into_message(),
            });
        }

        tracing::debug!("Loaded {} admin events ({:?})", body.events.len(), filter);
        Ok(body.events)
    }

    async fn create(&self, payload: EventPayload) -> AppResult<()> {
        let url = self.api.endpoint(&["admin", "events"])?;
        let request = self
            .api
            .http()
            .post(url)
            .bearer_auth(&self.token)
            .multipart(payload.into_form()?);

        read_ack(self.api.send(request).await?).await?;
        tracing::info!("Event created");
        Ok(())
    }

    async fn update(&self, event_id: &str, payload: EventPayload) -> AppResult<()> {
        let url = self.api.endpoint(&["admin", "events", event_id])?;
        let request = self
            .api
            .http()
            .put(url)
            .bearer_auth(&self.token)
            .multipart(payload.into_form()?);

        read_ack(self.api.send(request).await?).await?;
        tracing::info!("Event {} updated", event_id);
        Ok(())
    }

    async fn delete(&self, event_id: &str) -> AppResult<()> {
        let url = self.api.endpoint(&["admin", "events", event_id])?;
        let request = self.api.http().delete(url).bearer_auth(&self.token);

        read_ack(self.api.send(request).await?).await?;
        tracing::info!("Event {} deleted", event_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(event_type: EventType, custom: Option<&str>) -> EventPayload {
        EventPayload {
            date: "15/12/2024".to_string(),
            month: "ДЕК".to_string(),
            performer: "Jazz Trio".to_string(),
            time: "19:30".to_string(),
            event_type,
            custom_type: custom.map(str::to_string),
            is_highlighted: true,
            description: String::new(),
            location: "Main hall".to_string(),
            is_active: true,
            display_order: 3,
            image: None,
        }
    }

    #[test]
    fn custom_type_only_sent_for_custom_events() {
        let fields = payload(EventType::Dj, Some("ignored")).text_fields();
        assert!(fields.iter().all(|(k, _)| *k != "customType"));

        let fields = payload(EventType::Custom, Some("Stand-up")).text_fields();
        assert!(fields.contains(&("customType", "Stand-up".to_string())));
        assert!(fields.contains(&("type", "custom".to_string())));
    }

    #[test]
    fn booleans_and_order_are_stringified() {
        let fields = payload(EventType::Quiz, None).text_fields();
        assert!(fields.contains(&("isHighlighted", "true".to_string())));
        assert!(fields.contains(&("isActive", "true".to_string())));
        assert!(fields.contains(&("displayOrder", "3".to_string())));
        assert_eq!(fields[0], ("date", "15/12/2024".to_string()));
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("poster.JPG"), "image/jpeg");
        assert_eq!(content_type_for("poster.png"), "image/png");
        assert_eq!(content_type_for("poster"), "application/octet-stream");
    }

    #[tokio::test]
    async fn image_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poster.webp");
        tokio::fs::write(&path, b"RIFF").await.unwrap();

        let image = ImageUpload::from_path(&path).await.unwrap();
        assert_eq!(image.file_name, "poster.webp");
        assert_eq!(image.content_type, "image/webp");
        assert_eq!(image.bytes, b"RIFF");

        let missing = ImageUpload::from_path(&dir.path().join("nope.png")).await;
        assert!(matches!(missing, Err(AppError::Validation(_))));
    }
}
