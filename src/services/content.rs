use chrono::NaiveDate;

use crate::error::{AppError, AppResult};
use crate::models::{Event, EventsResponse};
use crate::services::api::{read_json, ApiClient};

/// Read-only public content endpoints (no authentication).
#[derive(Debug, Clone)]
pub struct PublicContentClient {
    api: ApiClient,
}

impl PublicContentClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// `GET content/events`
    pub async fn events(&self) -> AppResult<Vec<Event>> {
        let url = self.api.endpoint(&["content", "events"])?;
        let response = self.api.send(self.api.http().get(url)).await?;
        let body: EventsResponse = read_json(response).await?;

        if !body.success {
            return Err(AppError::Api {
                status: reqwest::StatusCode::OK,
                message: body.error.into_message(),
            });
        }

        Ok(body.events)
    }

    pub async fn promotions(&self, today: NaiveDate) -> AppResult<PromotionsDigest> {
        let events = self.events().await?;
        Ok(PromotionsDigest::from_events(events, today))
    }
}

/// Events shown in the promotions screen: active and not yet past,
/// highlighted ones pulled out on top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromotionsDigest {
    pub highlighted: Vec<Event>,
    pub upcoming: Vec<Event>,
}

impl PromotionsDigest {
    pub fn from_events(events: Vec<Event>, today: NaiveDate) -> Self {
        let mut visible: Vec<Event> = events
            .into_iter()
            .filter(|e| e.is_active && e.date >= today)
            .collect();

        visible.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.display_order.cmp(&b.display_order))
                .then(a.time.cmp(&b.time))
        });

        let (highlighted, upcoming) = visible.into_iter().partition(|e| e.is_highlighted);
        Self {
            highlighted,
            upcoming,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.highlighted.is_empty() && self.upcoming.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(id: u32, date: &str, time: &str, order: i32, highlighted: bool, active: bool) -> Event {
        serde_json::from_value(json!({
            "id": id,
            "date": date,
            "performer": format!("Performer {id}"),
            "time": time,
            "type": "dj",
            "isHighlighted": highlighted,
            "isActive": active,
            "displayOrder": order
        }))
        .unwrap()
    }

    #[test]
    fn digest_filters_and_orders() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 10).unwrap();
        let events = vec![
            event(1, "2024-12-20", "20:00", 0, false, true),
            event(2, "2024-12-01", "20:00", 0, false, true),
            event(3, "2024-12-15", "21:00", 1, false, true),
            event(4, "2024-12-15", "19:00", 0, false, true),
            event(5, "2024-12-12", "18:00", 0, true, true),
            event(6, "2024-12-11", "18:00", 0, true, false),
            event(7, "2024-12-10", "12:00", 0, false, true),
        ];

        let digest = PromotionsDigest::from_events(events, today);
        let ids = |v: &[Event]| v.iter().map(|e| e.id.clone()).collect::<Vec<_>>();

        assert_eq!(ids(&digest.highlighted), vec!["5"]);
        assert_eq!(ids(&digest.upcoming), vec!["7", "4", "3", "1"]);
    }

    #[test]
    fn empty_digest() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 10).unwrap();
        assert!(PromotionsDigest::from_events(Vec::new(), today).is_empty());
    }
}
