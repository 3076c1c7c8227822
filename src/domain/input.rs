//! Validated create and patch payloads.
//!
//! Patches enumerate optional fields explicitly and are merged field by field
//! into a loaded record.

use rust_decimal::Decimal;
use serde::Deserialize;

use super::entities::{DishRecord, MenuRecord, SubmenuRecord};
use super::error::DomainError;
use super::price::{fits_storage, quantize};

const MIN_TITLE_CHARS: usize = 3;

fn validate_title(title: &str) -> Result<String, DomainError> {
    let trimmed = title.trim();
    if trimmed.chars().count() < MIN_TITLE_CHARS {
        return Err(DomainError::validation(
            "title",
            format!("must contain at least {MIN_TITLE_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: Decimal) -> Result<Decimal, DomainError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(DomainError::validation("price", "must not be negative"));
    }
    if !fits_storage(price) {
        return Err(DomainError::validation("price", "is out of range"));
    }
    Ok(quantize(price))
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMenu {
    pub title: String,
    pub description: Option<String>,
}

impl TryFrom<MenuInput> for NewMenu {
    type Error = DomainError;

    fn try_from(input: MenuInput) -> Result<Self, Self::Error> {
        Ok(Self {
            title: validate_title(&input.title)?,
            description: normalize_description(input.description),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct MenuPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl MenuPatch {
    pub fn validate(self) -> Result<Self, DomainError> {
        Ok(Self {
            title: self.title.as_deref().map(validate_title).transpose()?,
            description: self.description,
        })
    }

    pub fn apply(&self, record: &mut MenuRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(description) = &self.description {
            record.description = normalize_description(Some(description.clone()));
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmenuInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmenu {
    pub title: String,
    pub description: Option<String>,
}

impl TryFrom<SubmenuInput> for NewSubmenu {
    type Error = DomainError;

    fn try_from(input: SubmenuInput) -> Result<Self, Self::Error> {
        Ok(Self {
            title: validate_title(&input.title)?,
            description: normalize_description(input.description),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SubmenuPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SubmenuPatch {
    pub fn validate(self) -> Result<Self, DomainError> {
        Ok(Self {
            title: self.title.as_deref().map(validate_title).transpose()?,
            description: self.description,
        })
    }

    pub fn apply(&self, record: &mut SubmenuRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(description) = &self.description {
            record.description = normalize_description(Some(description.clone()));
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DishInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDish {
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
}

impl TryFrom<DishInput> for NewDish {
    type Error = DomainError;

    fn try_from(input: DishInput) -> Result<Self, Self::Error> {
        Ok(Self {
            title: validate_title(&input.title)?,
            description: normalize_description(input.description),
            price: validate_price(input.price)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct DishPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
}

impl DishPatch {
    pub fn validate(self) -> Result<Self, DomainError> {
        Ok(Self {
            title: self.title.as_deref().map(validate_title).transpose()?,
            description: self.description,
            price: self.price.map(validate_price).transpose()?,
        })
    }

    pub fn apply(&self, record: &mut DishRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(description) = &self.description {
            record.description = normalize_description(Some(description.clone()));
        }
        if let Some(price) = self.price {
            record.price = price;
        }
    }
}
