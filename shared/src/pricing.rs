//! Order pricing
//!
//! Line totals are `(unit price + addons per unit) × quantity`, order totals
//! are the sum of lines plus the delivery fee (delivery orders only) minus
//! the discount, never below zero. All money is rounded to two decimal places,
//! midpoint away from zero.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{OrderType, ResolvedAddon};

/// Decimal places used for money
pub const MONEY_DP: u32 = 2;

/// Largest quantity accepted for a single line
pub const MAX_LINE_QUANTITY: i32 = 999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("Quantity must be between 1 and {max}, got {quantity}")]
    InvalidQuantity { quantity: i32, max: i32 },

    #[error("Prices cannot be negative")]
    NegativePrice,

    #[error("Delivery fee cannot be negative")]
    NegativeDeliveryFee,

    #[error("Discount cannot be negative")]
    NegativeDiscount,

    #[error("Cash tendered ({tendered}) is less than the order total ({total})")]
    InsufficientCash { total: Decimal, tendered: Decimal },
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Sum of addon price × addon quantity, per unit of the parent item
pub fn addon_total(addons: &[ResolvedAddon]) -> Decimal {
    round_money(
        addons
            .iter()
            .map(|a| a.unit_price * Decimal::from(a.quantity))
            .sum(),
    )
}

/// `(unit_price + addons_per_unit) × quantity`
pub fn line_total(unit_price: Decimal, quantity: i32, addons_per_unit: Decimal) -> Decimal {
    round_money((unit_price + addons_per_unit) * Decimal::from(quantity))
}

/// A fully priced order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLine {
    pub unit_price: Decimal,
    pub quantity: i32,
    pub addons_total: Decimal,
    pub total: Decimal,
}

/// Price a line from its unit price, quantity and resolved addons
pub fn price_line(
    unit_price: Decimal,
    quantity: i32,
    addons: &[ResolvedAddon],
) -> Result<PricedLine, PricingError> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(PricingError::InvalidQuantity {
            quantity,
            max: MAX_LINE_QUANTITY,
        });
    }
    if let Some(addon) = addons.iter().find(|a| !(1..=MAX_LINE_QUANTITY).contains(&a.quantity)) {
        return Err(PricingError::InvalidQuantity {
            quantity: addon.quantity,
            max: MAX_LINE_QUANTITY,
        });
    }
    if unit_price < Decimal::ZERO || addons.iter().any(|a| a.unit_price < Decimal::ZERO) {
        return Err(PricingError::NegativePrice);
    }

    let unit_price = round_money(unit_price);
    let addons_total = addon_total(addons);
    Ok(PricedLine {
        unit_price,
        quantity,
        addons_total,
        total: line_total(unit_price, quantity, addons_total),
    })
}

/// Order-level money
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute totals from line totals. The delivery fee is ignored for
    /// non-delivery orders.
    pub fn compute<I>(
        line_totals: I,
        order_type: OrderType,
        delivery_fee: Decimal,
        discount: Decimal,
    ) -> Result<Self, PricingError>
    where
        I: IntoIterator<Item = Decimal>,
    {
        if delivery_fee < Decimal::ZERO {
            return Err(PricingError::NegativeDeliveryFee);
        }
        if discount < Decimal::ZERO {
            return Err(PricingError::NegativeDiscount);
        }

        let subtotal = round_money(line_totals.into_iter().sum());
        let delivery_fee = match order_type {
            OrderType::Delivery => round_money(delivery_fee),
            OrderType::Counter | OrderType::Table => Decimal::ZERO,
        };
        let discount = round_money(discount);
        let total = (subtotal + delivery_fee - discount).max(Decimal::ZERO);

        Ok(Self {
            subtotal,
            delivery_fee,
            discount,
            total,
        })
    }
}

/// Change to hand back for a cash payment
pub fn change_due(total: Decimal, cash_tendered: Decimal) -> Result<Decimal, PricingError> {
    if cash_tendered < total {
        return Err(PricingError::InsufficientCash {
            total,
            tendered: cash_tendered,
        });
    }
    Ok(round_money(cash_tendered - total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn addon(price: &str, quantity: i32) -> ResolvedAddon {
        ResolvedAddon {
            addon_id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            name: "Bacon".to_string(),
            unit_price: dec(price),
            quantity,
        }
    }

    #[test]
    fn test_price_line_with_addons() {
        let line = price_line(dec("22.90"), 2, &[addon("4.50", 1), addon("1.25", 2)]).unwrap();
        assert_eq!(line.addons_total, dec("7.00"));
        assert_eq!(line.total, dec("59.80"));
    }

    #[test]
    fn test_price_line_rejects_bad_input() {
        assert_eq!(
            price_line(dec("10"), 0, &[]),
            Err(PricingError::InvalidQuantity { quantity: 0, max: MAX_LINE_QUANTITY })
        );
        assert_eq!(price_line(dec("-1"), 1, &[]), Err(PricingError::NegativePrice));
        assert_eq!(price_line(dec("1"), 1, &[addon("-2", 1)]), Err(PricingError::NegativePrice));
        assert_eq!(
            price_line(dec("1"), 1, &[addon("2", -5)]),
            Err(PricingError::InvalidQuantity { quantity: -5, max: MAX_LINE_QUANTITY })
        );
        assert!(price_line(dec("1"), 1, &[addon("2", 0)]).is_err());
    }

    #[test]
    fn test_line_total_uses_stored_unit_price() {
        let line = price_line(dec("3.333"), 3, &[]).unwrap();
        assert_eq!(line.unit_price, dec("3.33"));
        assert_eq!(line.total, dec("9.99"));
        assert_eq!(line.total, line.unit_price * Decimal::from(line.quantity));
    }

    #[test]
    fn test_delivery_fee_only_for_delivery() {
        let lines = vec![dec("30.00"), dec("12.50")];
        let delivery = OrderTotals::compute(lines.clone(), OrderType::Delivery, dec("5"), Decimal::ZERO).unwrap();
        assert_eq!(delivery.total, dec("47.50"));

        let counter = OrderTotals::compute(lines, OrderType::Counter, dec("5"), Decimal::ZERO).unwrap();
        assert_eq!(counter.delivery_fee, Decimal::ZERO);
        assert_eq!(counter.total, dec("42.50"));
    }

    #[test]
    fn test_discount_never_makes_total_negative() {
        let totals = OrderTotals::compute(vec![dec("10")], OrderType::Table, Decimal::ZERO, dec("15")).unwrap();
        assert_eq!(totals.total, Decimal::ZERO);
        assert!(OrderTotals::compute(vec![dec("10")], OrderType::Table, Decimal::ZERO, dec("-1")).is_err());
        assert!(OrderTotals::compute(vec![dec("10")], OrderType::Delivery, dec("-1"), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_change_due() {
        assert_eq!(change_due(dec("47.50"), dec("50")).unwrap(), dec("2.50"));
        assert_eq!(change_due(dec("10"), dec("10")).unwrap(), Decimal::ZERO);
        assert!(change_due(dec("10"), dec("9.99")).is_err());
    }

    #[test]
    fn test_rounding_midpoint_away_from_zero() {
        assert_eq!(round_money(dec("1.005")), dec("1.01"));
        assert_eq!(round_money(dec("-1.005")), dec("-1.01"));
        assert_eq!(line_total(dec("3.333"), 3, Decimal::ZERO), dec("10.00"));
    }
}
