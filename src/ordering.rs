//! Order pricing.
//!
//! Totals are computed from the restaurant's current catalog prices only. The result carries the
//! per-line unit price so it can be snapshotted into `order_items`.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{OrderLineRequest, PricedLine, PricedOrder},
};

/// price_order
///
/// Prices `lines` against `catalog` (menu item id → unit price of the ordered restaurant).
/// Rejects the whole order if it has no lines, a non-positive quantity, or a menu item the
/// restaurant does not offer.
pub fn price_order(
    lines: &[OrderLineRequest],
    catalog: &HashMap<Uuid, Decimal>,
) -> Result<PricedOrder, AppError> {
    if lines.is_empty() {
        return Err(AppError::Validation("Missing required fields: items".to_string()));
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;

    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::Validation(format!(
                "Quantity for menu item {} must be positive",
                line.menu_item_id
            )));
        }

        let unit_price = *catalog.get(&line.menu_item_id).ok_or_else(|| {
            AppError::Validation(format!(
                "Menu item {} is not on this restaurant's menu",
                line.menu_item_id
            ))
        })?;

        total = unit_price
            .checked_mul(Decimal::from(line.quantity))
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(|| AppError::Validation("Order total is out of range".to_string()))?;
        priced.push(PricedLine {
            menu_item_id: line.menu_item_id,
            quantity: line.quantity,
            unit_price,
        });
    }

    Ok(PricedOrder {
        lines: priced,
        total,
    })
}

/// Converts a money amount to integer cents, rounding half away from zero to two places.
pub fn to_cents(amount: Decimal) -> Result<i64, AppError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AppError::Validation("Price must not be negative".to_string()));
    }
    amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| AppError::Validation("Price is out of range".to_string()))
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
