use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{de_id, de_null_default, de_null_true, de_opt_id};
use crate::dates;
use crate::i18n;

// ============================================================================
// Event Type
// ============================================================================

/// Kinds of events the cafe schedules. `Custom` carries its label separately
/// in `Event::custom_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    LiveMusic,
    Dj,
    Karaoke,
    Quiz,
    Promotion,
    Custom,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::LiveMusic,
        EventType::Dj,
        EventType::Karaoke,
        EventType::Quiz,
        EventType::Promotion,
        EventType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::LiveMusic => "live_music",
            EventType::Dj => "dj",
            EventType::Karaoke => "karaoke",
            EventType::Quiz => "quiz",
            EventType::Promotion => "promotion",
            EventType::Custom => "custom",
        }
    }

    /// Localized name, e.g. "Живая музыка".
    pub fn label(&self, lang: &str) -> String {
        i18n::tr(Some(lang), &format!("event_type.{}", self.as_str()), None)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = EventType::ALL.iter().map(|t| t.as_str()).collect();
                format!("unknown event type {s:?}, expected one of: {}", known.join(", "))
            })
    }
}

// ============================================================================
// Event
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(deserialize_with = "de_id", alias = "_id")]
    pub id: String,
    #[serde(with = "api_date")]
    pub date: NaiveDate,
    /// Month code stored by the admin; may be blank, in which case it is
    /// derived from `date`.
    #[serde(default)]
    pub month: Option<String>,
    pub performer: String,
    #[serde(with = "api_time")]
    pub time: NaiveTime,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub custom_type: Option<String>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub is_highlighted: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_true", deserialize_with = "de_null_true")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "de_null_default")]
    pub display_order: i32,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing)]
    pub branch_id: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Event {
    /// Stored month code, or the one derived from the date.
    pub fn month_label(&self) -> String {
        self.month
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| dates::month_label(self.date).to_string())
    }

    pub fn day_month(&self) -> dates::DayMonth {
        let mut label = dates::day_month(self.date);
        label.month = self.month_label();
        label
    }

    pub fn time_label(&self) -> String {
        dates::format_time(self.time)
    }

    /// Custom label for `custom` events, the localized type name otherwise.
    pub fn type_label(&self, lang: &str) -> String {
        match (self.event_type, self.custom_type.as_deref().map(str::trim)) {
            (EventType::Custom, Some(label)) if !label.is_empty() => label.to_string(),
            (t, _) => t.label(lang),
        }
    }
}

/// Dates are written back in input form and read from any supported shape.
mod api_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::dates;

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dates::format_input(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        dates::parse_any_date(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid event date: {raw:?}")))
    }
}

mod api_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::dates;

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dates::format_time(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        dates::parse_time(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid event time: {raw:?}")))
    }
}

// ============================================================================
// Listing filter
// ============================================================================

/// Optional filters of the admin events list. Both are independent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub event_type: Option<EventType>,
    pub month: Option<String>,
}

impl EventFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(t) = self.event_type {
            pairs.push(("type", t.as_str().to_string()));
        }
        if let Some(month) = self.month.as_deref().filter(|m| !m.trim().is_empty()) {
            pairs.push(("month", month.trim().to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "id": 42,
            "date": "2024-12-15",
            "month": "",
            "performer": "Jazz Trio",
            "time": "19:30",
            "type": "live_music",
            "isHighlighted": true,
            "description": "Vinyl night",
            "location": "Main hall",
            "isActive": true,
            "displayOrder": 2
        })
    }

    #[test]
    fn parses_api_event() {
        let event: Event = serde_json::from_value(sample()).unwrap();
        assert_eq!(event.id, "42");
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2024, 12, 15).unwrap());
        assert_eq!(event.event_type, EventType::LiveMusic);
        assert_eq!(event.month_label(), "ДЕК");
        assert_eq!(event.time_label(), "19:30");
        assert!(event.is_highlighted);
    }

    #[test]
    fn display_form_dates_are_accepted() {
        let mut raw = sample();
        raw["date"] = json!("15/12/2024");
        let event: Event = serde_json::from_value(raw).unwrap();
        assert_eq!(event.day_month().day_month, "15.12");
    }

    #[test]
    fn malformed_event_fails_fast() {
        let mut raw = sample();
        raw["date"] = json!("31/02/2024");
        assert!(serde_json::from_value::<Event>(raw).is_err());

        let mut raw = sample();
        raw["type"] = json!("rave");
        assert!(serde_json::from_value::<Event>(raw).is_err());
    }

    #[test]
    fn stored_month_overrides_derived_one() {
        let mut raw = sample();
        raw["month"] = json!("НГ");
        let event: Event = serde_json::from_value(raw).unwrap();
        assert_eq!(event.month_label(), "НГ");
        assert_eq!(event.day_month().month, "НГ");
    }

    #[test]
    fn custom_type_label() {
        let mut raw = sample();
        raw["type"] = json!("custom");
        raw["customType"] = json!("Stand-up");
        let event: Event = serde_json::from_value(raw).unwrap();
        assert_eq!(event.type_label("en"), "Stand-up");
    }

    #[test]
    fn event_type_from_str() {
        assert_eq!("DJ".parse::<EventType>().unwrap(), EventType::Dj);
        assert_eq!("live-music".parse::<EventType>().unwrap(), EventType::LiveMusic);
        assert!("rave".parse::<EventType>().is_err());
    }

    #[test]
    fn filter_query_pairs() {
        let filter = EventFilter {
            event_type: Some(EventType::Quiz),
            month: Some(" ЯНВ ".to_string()),
        };
        assert_eq!(
            filter.query_pairs(),
            vec![("type", "quiz".to_string()), ("month", "ЯНВ".to_string())]
        );
        assert!(EventFilter::default().query_pairs().is_empty());
    }
}
