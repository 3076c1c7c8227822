//! Spreadsheet snapshot model and row parser.
//!
//! The sheet is read top to bottom. A canonical UUID in column A opens a
//! menu, in column B a submenu of the last menu, in column C a dish of the
//! last submenu. Any other row is ignored.
//!
//! | kind    | A  | B     | C     | D     | E           | F     | G          |
//! |---------|----|-------|-------|-------|-------------|-------|------------|
//! | menu    | id | title | desc  |       |             |       |            |
//! | submenu |    | id    | title | desc  |             |       |            |
//! | dish    |    |       | id    | title | description | price | discount % |

use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::price::{fits_storage, quantize};
use crate::domain::tree::{DishTree, MenuTree, SubmenuTree};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read spreadsheet `{source_name}`: {message}")]
    Read {
        source_name: String,
        message: String,
    },
    #[error("spreadsheet request failed: {0}")]
    Fetch(String),
    #[error("row {row}: {message}")]
    Row { row: usize, message: String },
}

impl SnapshotError {
    fn row(index: usize, message: impl Into<String>) -> Self {
        Self::Row {
            row: index + 1,
            message: message.into(),
        }
    }
}

/// Producer of the current external tree.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Human-readable origin for logs.
    fn describe(&self) -> String;

    async fn load(&self) -> Result<Vec<MenuTree>, SnapshotError>;
}

/// One spreadsheet cell, normalized across file and remote sources.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    fn text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(value) => {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(value) => Some(value.to_string()),
        }
    }

    fn decimal(&self) -> Result<Option<Decimal>, String> {
        match self {
            Cell::Empty => Ok(None),
            Cell::Number(value) => Decimal::try_from(*value)
                .map(Some)
                .map_err(|err| format!("`{value}` is not a decimal: {err}")),
            Cell::Text(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                Decimal::from_str(&trimmed.replace(',', "."))
                    .map(Some)
                    .map_err(|err| format!("`{trimmed}` is not a decimal: {err}"))
            }
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

fn cell(row: &[Cell], index: usize) -> &Cell {
    row.get(index).unwrap_or(&Cell::Empty)
}

/// Parse the cell as an id only when it is a canonical lowercase UUID.
fn canonical_uuid(cell: &Cell) -> Option<Uuid> {
    let Cell::Text(raw) = cell else {
        return None;
    };
    let raw = raw.trim();
    let id = Uuid::parse_str(raw).ok()?;
    (id.hyphenated().to_string() == raw).then_some(id)
}

fn required_text(row: &[Cell], column: usize, index: usize, what: &str) -> Result<String, SnapshotError> {
    cell(row, column)
        .text()
        .ok_or_else(|| SnapshotError::row(index, format!("{what} is missing")))
}

/// Build the nested tree from raw sheet rows.
pub fn parse_rows(rows: &[Vec<Cell>]) -> Result<Vec<MenuTree>, SnapshotError> {
    let mut menus: Vec<MenuTree> = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        if let Some(id) = canonical_uuid(cell(row, 0)) {
            menus.push(MenuTree {
                id,
                title: required_text(row, 1, index, "menu title")?,
                description: cell(row, 2).text(),
                submenus: Vec::new(),
            });
        } else if let Some(id) = canonical_uuid(cell(row, 1)) {
            let menu = menus
                .last_mut()
                .ok_or_else(|| SnapshotError::row(index, "submenu appears before any menu"))?;
            menu.submenus.push(SubmenuTree {
                id,
                title: required_text(row, 2, index, "submenu title")?,
                description: cell(row, 3).text(),
                dishes: Vec::new(),
            });
        } else if let Some(id) = canonical_uuid(cell(row, 2)) {
            let submenu = menus
                .last_mut()
                .and_then(|menu| menu.submenus.last_mut())
                .ok_or_else(|| SnapshotError::row(index, "dish appears before any submenu"))?;

            let price = cell(row, 5)
                .decimal()
                .map_err(|message| SnapshotError::row(index, message))?
                .ok_or_else(|| SnapshotError::row(index, "dish price is missing"))?;
            if price.is_sign_negative() && !price.is_zero() {
                return Err(SnapshotError::row(index, "dish price must not be negative"));
            }
            if !fits_storage(price) {
                return Err(SnapshotError::row(index, "dish price is out of range"));
            }

            let discount = cell(row, 6)
                .decimal()
                .map_err(|message| SnapshotError::row(index, message))?;
            if discount.is_some_and(|pct| pct.is_sign_negative() && !pct.is_zero()) {
                return Err(SnapshotError::row(index, "discount must not be negative"));
            }

            submenu.dishes.push(DishTree {
                id,
                title: required_text(row, 3, index, "dish title")?,
                description: cell(row, 4).text(),
                price: quantize(price),
                discount,
            });
        }
    }

    Ok(menus)
}
