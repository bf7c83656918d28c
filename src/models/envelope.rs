use serde::Deserialize;

use super::{de_lenient_list, Event, Purchase};

/// Error body shape shared by the cafe API: `{ "error": "..." }` or
/// `{ "message": "..." }`, sometimes both.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Prefers `error` over `message`; blank strings count as absent.
    pub fn into_message(self) -> Option<String> {
        self.error
            .filter(|s| !s.trim().is_empty())
            .or(self.message.filter(|s| !s.trim().is_empty()))
    }
}

/// `{ success }` acknowledgement returned by write endpoints.
#[derive(Debug, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(flatten)]
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct EventsResponse {
    pub success: bool,
    #[serde(default, deserialize_with = "de_lenient_list")]
    pub events: Vec<Event>,
    #[serde(flatten)]
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct PurchasesResponse {
    pub success: bool,
    #[serde(default, deserialize_with = "de_lenient_list")]
    pub purchases: Vec<Purchase>,
    #[serde(flatten)]
    pub error: ErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_preferred_over_message() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":"Bad date","message":"Validation failed"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Bad date"));
    }

    #[test]
    fn blank_error_falls_back_to_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":"  ","message":"Nope"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Nope"));
    }

    #[test]
    fn success_response_flattens_error() {
        let resp: SuccessResponse =
            serde_json::from_str(r#"{"success":false,"error":"Duplicate"}"#).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error.into_message().as_deref(), Some("Duplicate"));
    }

    #[test]
    fn events_list_keeps_good_rows() {
        let resp: EventsResponse = serde_json::from_value(serde_json::json!({
            "success": true,
            "events": [
                {"id": 1, "date": "2024-12-15", "performer": "Jazz Trio", "time": "19:30",
                 "type": "live_music", "displayOrder": null, "isHighlighted": null, "isActive": null},
                {"id": 2, "date": "2024-12-16", "performer": "Rave", "time": "22:00", "type": "rave"}
            ]
        }))
        .unwrap();
        assert_eq!(resp.events.len(), 1);
        assert_eq!(resp.events[0].display_order, 0);
        assert!(!resp.events[0].is_highlighted);
        assert!(resp.events[0].is_active);
    }

    #[test]
    fn purchases_list_keeps_good_rows() {
        let resp: PurchasesResponse = serde_json::from_value(serde_json::json!({
            "success": true,
            "purchases": [
                {"id": 1, "createdAt": "2024-12-15T10:00:00Z", "total": 100, "pointsEarned": null},
                {"createdAt": "2024-12-16T10:00:00Z"}
            ]
        }))
        .unwrap();
        assert_eq!(resp.purchases.len(), 1);
        assert_eq!(resp.purchases[0].points_earned, 0);
    }
}
