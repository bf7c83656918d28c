//! Data-transfer types for the cafe API.
//!
//! Every payload is parsed into an explicit type at the HTTP boundary. A
//! malformed envelope fails there; a malformed row inside a list is skipped.

pub mod envelope;
pub mod event;
pub mod menu;
pub mod purchase;

pub use self::envelope::*;
pub use self::event::*;
pub use self::menu::*;
pub use self::purchase::*;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Num(i64),
    Str(String),
}

impl From<RawId> for String {
    fn from(id: RawId) -> Self {
        match id {
            RawId::Num(n) => n.to_string(),
            RawId::Str(s) => s,
        }
    }
}

/// Identifiers arrive as numbers from some endpoints and strings from others.
pub(crate) fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

pub(crate) fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

/// Money amounts: a JSON number or a numeric string such as `"350.00"`.
pub(crate) fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Num(f64),
        Str(String),
    }

    match Option::<RawAmount>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(RawAmount::Num(n)) => Ok(n),
        Some(RawAmount::Str(s)) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid amount: {s:?}"))),
    }
}

/// Scalar flags and counters the server sometimes stores as `null`.
pub(crate) fn de_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn de_null_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

/// Parses each element of a list on its own; rows that do not fit `T` are
/// logged and skipped so one bad record does not blank the whole list.
pub(crate) fn de_lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<T>(v) {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::warn!("Skipping malformed {} row: {}", short_type_name::<T>(), e);
                None
            }
        })
        .collect())
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: i32,
        #[serde(default, deserialize_with = "de_null_default")]
        order: i32,
        #[serde(default = "yes", deserialize_with = "de_null_true")]
        active: bool,
    }

    fn yes() -> bool {
        true
    }

    #[derive(Debug, Deserialize)]
    struct Rows {
        #[serde(default, deserialize_with = "de_lenient_list")]
        rows: Vec<Row>,
    }

    #[test]
    fn null_scalars_take_defaults() {
        let row: Row = serde_json::from_value(json!({"id": 1, "order": null, "active": null})).unwrap();
        assert_eq!(row, Row { id: 1, order: 0, active: true });

        let row: Row = serde_json::from_value(json!({"id": 2, "active": false})).unwrap();
        assert!(!row.active);
    }

    #[test]
    fn bad_rows_are_skipped() {
        let parsed: Rows = serde_json::from_value(json!({
            "rows": [{"id": 1}, {"id": "x"}, {"order": 3}, {"id": 4, "order": 2}]
        }))
        .unwrap();
        let ids: Vec<i32> = parsed.rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn null_or_missing_list_is_empty() {
        let parsed: Rows = serde_json::from_value(json!({"rows": null})).unwrap();
        assert!(parsed.rows.is_empty());
        let parsed: Rows = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.rows.is_empty());
    }
}
