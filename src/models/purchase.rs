use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{de_amount, de_id, de_null_default};
use crate::dates;

// ============================================================================
// Purchase History Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "de_amount")]
    pub price: f64,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(alias = "date")]
    pub created_at: String,
    #[serde(default, deserialize_with = "de_amount")]
    pub total: f64,
    #[serde(default, deserialize_with = "de_null_default")]
    pub points_earned: i64,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default, deserialize_with = "de_items")]
    pub items: Vec<PurchaseItem>,
}

impl Purchase {
    /// `dd.mm.yyyy HH:mm`, or empty when the server sent an odd timestamp.
    pub fn display_date(&self) -> String {
        dates::format_timestamp(&self.created_at)
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Stored purchase items come in several shapes: a list, an object keyed by
/// item id, or either of those JSON-encoded into a string. Anything else is
/// an empty list.
fn de_items<'de, D>(deserializer: D) -> Result<Vec<PurchaseItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(items_from_value(raw, true))
}

pub fn items_from_value(raw: Value, allow_encoded: bool) -> Vec<PurchaseItem> {
    match raw {
        Value::Array(values) => collect_items(values),
        Value::Object(map) => collect_items(map.into_iter().map(|(_, v)| v).collect()),
        Value::String(encoded) if allow_encoded => match serde_json::from_str::<Value>(&encoded) {
            Ok(inner) => items_from_value(inner, false),
            Err(e) => {
                tracing::warn!("Unparseable purchase items string: {}", e);
                Vec::new()
            }
        },
        Value::Null => Vec::new(),
        other => {
            tracing::warn!("Unrecognized purchase items shape: {}", other);
            Vec::new()
        }
    }
}

fn collect_items(values: Vec<Value>) -> Vec<PurchaseItem> {
    values
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<PurchaseItem>(v) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("Skipping malformed purchase item: {}", e);
                None
            }
        })
        .collect()
}
