//! Nested menu → submenu → dish shape shared by the full-tree read and the
//! spreadsheet snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuTree {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub submenus: Vec<SubmenuTree>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmenuTree {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub dishes: Vec<DishTree>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishTree {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    /// Percentage discount carried only by snapshot rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
}
