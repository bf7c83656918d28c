//! Admin events screen.
//!
//! A single-screen state machine: `List -> Form -> submit -> List` and
//! `List -> ConfirmDelete -> List`. Every write is followed by a refetch of
//! the list with the current filters.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use crate::dates;
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::models::{Event, EventFilter, EventType};
use crate::services::events::{EventPayload, EventsApi, ImageUpload};

// ============================================================================
// Form
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("date is required")]
    MissingDate,
    #[error("date must be dd/mm/yyyy")]
    InvalidDate,
    #[error("performer is required")]
    MissingPerformer,
    #[error("time is required")]
    MissingTime,
    #[error("time must be HH:MM")]
    InvalidTime,
    #[error("custom type label is required")]
    MissingCustomType,
}

impl FormError {
    pub fn field(&self) -> &'static str {
        match self {
            FormError::MissingDate | FormError::InvalidDate => "date",
            FormError::MissingPerformer => "performer",
            FormError::MissingTime | FormError::InvalidTime => "time",
            FormError::MissingCustomType => "customType",
        }
    }

    pub fn message(&self, lang: &str) -> String {
        let key = match self {
            FormError::MissingDate => "validation.date_required",
            FormError::InvalidDate => "validation.date_invalid",
            FormError::MissingPerformer => "validation.performer_required",
            FormError::MissingTime => "validation.time_required",
            FormError::InvalidTime => "validation.time_invalid",
            FormError::MissingCustomType => "validation.custom_type_required",
        };
        i18n::tr(Some(lang), key, None)
    }
}

/// Raw form input, shared by create and edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EventForm {
    /// `dd/mm/yyyy`
    pub date: String,
    /// Month code override; derived from the date when blank.
    pub month: String,
    pub performer: String,
    pub time: String,
    pub event_type: EventType,
    pub custom_type: String,
    pub is_highlighted: bool,
    pub description: String,
    pub location: String,
    pub is_active: bool,
    pub display_order: i32,
    pub image: Option<ImageUpload>,
}

impl Default for EventForm {
    fn default() -> Self {
        Self {
            date: String::new(),
            month: String::new(),
            performer: String::new(),
            time: String::new(),
            event_type: EventType::LiveMusic,
            custom_type: String::new(),
            is_highlighted: false,
            description: String::new(),
            location: String::new(),
            is_active: true,
            display_order: 0,
            image: None,
        }
    }
}

impl EventForm {
    pub fn from_event(event: &Event) -> Self {
        Self {
            date: dates::format_display(event.date),
            month: event.month.clone().unwrap_or_default(),
            performer: event.performer.clone(),
            time: event.time_label(),
            event_type: event.event_type,
            custom_type: event.custom_type.clone().unwrap_or_default(),
            is_highlighted: event.is_highlighted,
            description: event.description.clone().unwrap_or_default(),
            location: event.location.clone().unwrap_or_default(),
            is_active: event.is_active,
            display_order: event.display_order,
            image: None,
        }
    }

    /// Checks date, performer, time and custom label, in that order.
    pub fn validate(&self) -> Result<(NaiveDate, NaiveTime), FormError> {
        let date_raw = self.date.trim();
        if date_raw.is_empty() {
            return Err(FormError::MissingDate);
        }
        let date = dates::parse_display(date_raw).ok_or(FormError::InvalidDate)?;

        if self.performer.trim().is_empty() {
            return Err(FormError::MissingPerformer);
        }

        let time_raw = self.time.trim();
        if time_raw.is_empty() {
            return Err(FormError::MissingTime);
        }
        let time = dates::parse_time(time_raw).ok_or(FormError::InvalidTime)?;

        if self.event_type == EventType::Custom && self.custom_type.trim().is_empty() {
            return Err(FormError::MissingCustomType);
        }

        Ok((date, time))
    }

    pub fn into_payload(self) -> Result<EventPayload, FormError> {
        let (date, time) = self.validate()?;

        let month = match self.month.trim() {
            "" => dates::month_label(date).to_string(),
            m => m.to_string(),
        };
        let custom_type = (self.event_type == EventType::Custom)
            .then(|| self.custom_type.trim().to_string());

        Ok(EventPayload {
            date: dates::format_display(date),
            month,
            performer: self.performer.trim().to_string(),
            time: dates::format_time(time),
            event_type: self.event_type,
            custom_type,
            is_highlighted: self.is_highlighted,
            description: self.description.trim().to_string(),
            location: self.location.trim().to_string(),
            is_active: self.is_active,
            display_order: self.display_order,
            image: self.image,
        })
    }
}

// ============================================================================
// Editor
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { event_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    List,
    Form { mode: FormMode, form: EventForm },
    ConfirmDelete { event_id: String, performer: String },
}

pub struct EventsEditor {
    api: Arc<dyn EventsApi>,
    lang: String,
    screen: Screen,
    events: Vec<Event>,
    filter: EventFilter,
    error: Option<String>,
    notice: Option<String>,
}

impl EventsEditor {
    pub fn new(api: Arc<dyn EventsApi>, lang: &str) -> Self {
        Self {
            api,
            lang: lang.to_string(),
            screen: Screen::List,
            events: Vec::new(),
            filter: EventFilter::default(),
            error: None,
            notice: None,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Last user-visible error, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    fn tr(&self, key: &str) -> String {
        i18n::tr(Some(&self.lang), key, None)
    }

    /// Reloads the list with the current filters. On failure the previous
    /// list is kept and the error is shown.
    pub async fn refresh(&mut self) -> AppResult<()> {
        match self.api.list(&self.filter).await {
            Ok(events) => {
                self.events = events;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load events: {}", e);
                self.error = Some(self.tr("events.load_failed"));
                Err(e)
            }
        }
    }

    /// Replaces both filters. Refetches only when they changed; returns
    /// whether a fetch happened.
    pub async fn set_filter(&mut self, filter: EventFilter) -> AppResult<bool> {
        let filter = EventFilter {
            event_type: filter.event_type,
            month: filter
                .month
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
        };
        if self.filter == filter {
            return Ok(false);
        }
        self.filter = filter;
        self.refresh().await?;
        Ok(true)
    }

    pub async fn set_type_filter(&mut self, event_type: Option<EventType>) -> AppResult<bool> {
        let filter = EventFilter {
            event_type,
            ..self.filter.clone()
        };
        self.set_filter(filter).await
    }

    pub async fn set_month_filter(&mut self, month: Option<String>) -> AppResult<bool> {
        let filter = EventFilter {
            month,
            ..self.filter.clone()
        };
        self.set_filter(filter).await
    }

    pub fn open_create(&mut self) {
        self.error = None;
        self.screen = Screen::Form {
            mode: FormMode::Create,
            form: EventForm::default(),
        };
    }

    pub fn open_edit(&mut self, event_id: &str) -> AppResult<()> {
        let event = self.find(event_id)?;
        let form = EventForm::from_event(event);
        self.error = None;
        self.screen = Screen::Form {
            mode: FormMode::Edit {
                event_id: event_id.to_string(),
            },
            form,
        };
        Ok(())
    }

    /// The open form, if the editor is on the form screen.
    pub fn form_mut(&mut self) -> Option<&mut EventForm> {
        match &mut self.screen {
            Screen::Form { form, .. } => Some(form),
            _ => None,
        }
    }

    /// Validates and saves the open form. Validation failures never reach
    /// the API. On any failure the form stays open with the error shown.
    pub async fn submit(&mut self) -> AppResult<()> {
        let Screen::Form { mode, form } = &self.screen else {
            tracing::debug!("submit called without an open form");
            return Ok(());
        };
        let mode = mode.clone();

        let payload = match form.clone().into_payload() {
            Ok(payload) => payload,
            Err(e) => {
                let message = e.message(&self.lang);
                self.error = Some(message.clone());
                return Err(AppError::Validation(message));
            }
        };

        let result = match &mode {
            FormMode::Create => self.api.create(payload).await,
            FormMode::Edit { event_id } => self.api.update(event_id, payload).await,
        };

        if let Err(e) = result {
            tracing::error!("Failed to save event: {}", e);
            self.error = Some(self.server_message(&e, "events.save_failed"));
            return Err(e);
        }

        self.error = None;
        self.notice = Some(self.tr(match mode {
            FormMode::Create => "events.created",
            FormMode::Edit { .. } => "events.updated",
        }));
        self.screen = Screen::List;
        // The write went through; a failed reload only leaves the list stale.
        let _ = self.refresh().await;
        Ok(())
    }

    pub fn request_delete(&mut self, event_id: &str) -> AppResult<()> {
        let performer = self.find(event_id)?.performer.clone();
        self.error = None;
        self.screen = Screen::ConfirmDelete {
            event_id: event_id.to_string(),
            performer,
        };
        Ok(())
    }

    pub fn confirmation_prompt(&self) -> Option<String> {
        match &self.screen {
            Screen::ConfirmDelete { performer, .. } => Some(i18n::tr(
                Some(&self.lang),
                "events.confirm_delete",
                Some(&[("performer", performer.as_str())]),
            )),
            _ => None,
        }
    }

    /// Issues the delete for the pending confirmation and returns to the list.
    pub async fn confirm_delete(&mut self) -> AppResult<()> {
        let Screen::ConfirmDelete { event_id, .. } = &self.screen else {
            tracing::debug!("confirm_delete called without a pending deletion");
            return Ok(());
        };
        let event_id = event_id.clone();
        self.screen = Screen::List;

        if let Err(e) = self.api.delete(&event_id).await {
            tracing::error!("Failed to delete event {}: {}", event_id, e);
            self.error = Some(self.server_message(&e, "events.delete_failed"));
            return Err(e);
        }

        self.error = None;
        self.notice = Some(self.tr("events.deleted"));
        let _ = self.refresh().await;
        Ok(())
    }

    /// Leaves the form or the delete confirmation without doing anything.
    pub fn cancel(&mut self) {
        self.error = None;
        self.screen = Screen::List;
    }

    fn find(&self, event_id: &str) -> AppResult<&Event> {
        self.events
            .iter()
            .find(|e| e.id == event_id)
            .ok_or_else(|| {
                AppError::NotFound(i18n::tr(
                    Some(&self.lang),
                    "events.not_found",
                    Some(&[("id", event_id)]),
                ))
            })
    }

    fn server_message(&self, err: &AppError, fallback_key: &str) -> String {
        match err {
            AppError::Api {
                message: Some(msg), ..
            } => msg.clone(),
            AppError::Unauthorized => err.user_message(&self.lang),
            _ => self.tr(fallback_key),
        }
    }
}
