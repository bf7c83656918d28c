use serde::{Deserialize, Serialize};

use super::{de_amount, de_id, de_opt_id};

// ============================================================================
// Menu Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuCategory {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de_amount")]
    pub price: f64,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub category_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Raw `GET menu/:branchId` body. Both lists are required.
#[derive(Debug, Deserialize)]
pub struct MenuResponse {
    pub categories: Vec<MenuCategory>,
    pub items: Vec<MenuItem>,
}

/// Menu of one branch as handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuData {
    pub branch_id: String,
    pub categories: Vec<MenuCategory>,
    pub items: Vec<MenuItem>,
}

impl MenuData {
    pub fn from_response(branch_id: &str, response: MenuResponse) -> Self {
        let mut categories = response.categories;
        categories.sort_by_key(|c| c.sort_order);
        Self {
            branch_id: branch_id.to_string(),
            categories,
            items: response.items,
        }
    }

    /// Shape returned when the menu could not be fetched.
    pub fn fallback(branch_id: &str) -> Self {
        Self {
            branch_id: branch_id.to_string(),
            categories: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.items.is_empty()
    }

    pub fn items_in<'a>(&'a self, category_id: &'a str) -> impl Iterator<Item = &'a MenuItem> + 'a {
        self.items
            .iter()
            .filter(move |item| item.category_id.as_deref() == Some(category_id))
    }

    /// Items not attached to any listed category.
    pub fn uncategorized(&self) -> impl Iterator<Item = &MenuItem> + '_ {
        self.items.iter().filter(|item| {
            item.category_id
                .as_deref()
                .map_or(true, |id| !self.categories.iter().any(|c| c.id == id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_menu_sorted_by_category_order() {
        let response: MenuResponse = serde_json::from_value(json!({
            "categories": [
                {"id": 2, "name": "Десерты", "sortOrder": 2},
                {"id": 1, "name": "Кофе", "sortOrder": 1}
            ],
            "items": [
                {"id": 10, "name": "Капучино", "price": "250.00", "categoryId": 1},
                {"id": 11, "name": "Чизкейк", "price": 320, "categoryId": 2},
                {"id": 12, "name": "Секретный напиток", "price": 400}
            ]
        }))
        .unwrap();

        let menu = MenuData::from_response("7", response);
        assert_eq!(menu.branch_id, "7");
        assert_eq!(menu.categories[0].name, "Кофе");
        assert_eq!(menu.items_in("1").count(), 1);
        assert_eq!(menu.items[0].price, 250.0);
        assert!(menu.items[0].is_available);
        let loose: Vec<_> = menu.uncategorized().map(|i| i.id.as_str()).collect();
        assert_eq!(loose, vec!["12"]);
    }

    #[test]
    fn missing_lists_are_rejected() {
        assert!(serde_json::from_value::<MenuResponse>(json!({"items": []})).is_err());
        assert!(serde_json::from_value::<MenuResponse>(json!({"categories": {}, "items": []})).is_err());
    }

    #[test]
    fn fallback_is_empty() {
        let menu = MenuData::fallback("3");
        assert_eq!(menu.branch_id, "3");
        assert!(menu.is_empty());
    }
}
