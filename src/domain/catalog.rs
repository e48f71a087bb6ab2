use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order::Money;

// ============================================================================
// Catalog - Restaurants and dishes as seen by the ordering subsystem
// ============================================================================
//
// Catalog management (create/edit restaurants, categories, menus) happens
// elsewhere. Orders only read restaurants for ownership and dishes for prices.
// Prices and surcharges are never negative; stores refuse dishes that are.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
}

impl Restaurant {
    pub fn new(name: impl Into<String>, owner_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            owner_id,
        }
    }
}

/// A named choice inside a dish option, e.g. "Large" for option "Size".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishChoice {
    pub name: String,
    pub extra: Option<Money>,
}

/// A dish customisation. Either carries a flat `extra` or a list of choices
/// with their own surcharges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishOption {
    pub name: String,
    pub extra: Option<Money>,
    #[serde(default)]
    pub choices: Vec<DishChoice>,
}

impl DishOption {
    pub fn flat(name: impl Into<String>, extra: Money) -> Self {
        Self {
            name: name.into(),
            extra: Some(extra),
            choices: Vec::new(),
        }
    }

    pub fn with_choices(name: impl Into<String>, choices: Vec<DishChoice>) -> Self {
        Self {
            name: name.into(),
            extra: None,
            choices,
        }
    }

    pub fn choice(&self, name: &str) -> Option<&DishChoice> {
        self.choices.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub options: Vec<DishOption>,
}

impl Dish {
    pub fn new(restaurant_id: Uuid, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            restaurant_id,
            name: name.into(),
            price,
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, option: DishOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn option(&self, name: &str) -> Option<&DishOption> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Reject negative prices and surcharges.
    pub fn validate(&self) -> Result<(), InvalidDish> {
        let invalid = |field: String| InvalidDish { dish_id: self.id, field };

        if self.price.is_negative() {
            return Err(invalid("price".to_string()));
        }
        for option in &self.options {
            if option.extra.is_some_and(Money::is_negative) {
                return Err(invalid(format!("option {}", option.name)));
            }
            if let Some(choice) = option.choices.iter().find(|c| c.extra.is_some_and(Money::is_negative)) {
                return Err(invalid(format!("choice {}/{}", option.name, choice.name)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Dish {dish_id} has a negative amount in {field}")]
pub struct InvalidDish {
    pub dish_id: Uuid,
    pub field: String,
}
