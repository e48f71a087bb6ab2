use crate::domain::catalog::{Dish, InvalidDish};

use super::value_objects::{Money, OrderItemOption};

// ============================================================================
// Pricing - line totals from a dish price plus option surcharges
// ============================================================================
//
// Rules per requested option:
// - unknown option name: ignored
// - option with a non-zero flat extra: extra is added, choice is not consulted
// - otherwise: the requested choice's extra is added if that choice exists
//
// Dishes with negative amounts are refused, so a line never costs less than
// its dish. Sums are checked.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error(transparent)]
    InvalidDish(#[from] InvalidDish),

    #[error("Order total does not fit in the money range")]
    Overflow,
}

/// Surcharge contributed by a single requested option.
pub fn option_surcharge(dish: &Dish, selection: &OrderItemOption) -> Money {
    let Some(option) = dish.option(&selection.name) else {
        return Money::ZERO;
    };

    match option.extra {
        Some(extra) if !extra.is_zero() => extra,
        _ => selection
            .choice
            .as_deref()
            .and_then(|choice| option.choice(choice))
            .and_then(|choice| choice.extra)
            .unwrap_or(Money::ZERO),
    }
}

/// Price of one order line.
pub fn item_price(dish: &Dish, selections: &[OrderItemOption]) -> Result<Money, PricingError> {
    dish.validate()?;

    selections.iter().try_fold(dish.price, |price, selection| {
        price
            .checked_add(option_surcharge(dish, selection))
            .ok_or(PricingError::Overflow)
    })
}

/// Sum of all line prices.
pub fn order_total<'a, I>(lines: I) -> Result<Money, PricingError>
where
    I: IntoIterator<Item = (&'a Dish, &'a [OrderItemOption])>,
{
    lines.into_iter().try_fold(Money::ZERO, |total, (dish, selections)| {
        total
            .checked_add(item_price(dish, selections)?)
            .ok_or(PricingError::Overflow)
    })
}
