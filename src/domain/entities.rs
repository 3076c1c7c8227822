//! Domain entities mirrored from persistent storage, plus the read models
//! that carry aggregated child counts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

/// Menu as returned by detail and list reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub submenus_count: i64,
    pub dishes_count: i64,
}

impl MenuSummary {
    pub fn empty(record: MenuRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            submenus_count: 0,
            dishes_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmenuRecord {
    pub id: Uuid,
    pub menu_id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmenuSummary {
    pub id: Uuid,
    pub menu_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub dishes_count: i64,
}

impl SubmenuSummary {
    pub fn empty(record: SubmenuRecord) -> Self {
        Self {
            id: record.id,
            menu_id: record.menu_id,
            title: record.title,
            description: record.description,
            dishes_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishRecord {
    pub id: Uuid,
    pub submenu_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
}

/// Dish as shown to readers. `price` carries the discount overlay when one
/// is cached for the dish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
}

impl From<DishRecord> for DishView {
    fn from(record: DishRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            price: record.price,
        }
    }
}
