//! Customer models

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer of an establishment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub name: String,
    /// Stored normalized (digits only)
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub address_reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregated order history of a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerStats {
    pub customer_id: Uuid,
    pub order_count: i64,
    pub total_spent: Decimal,
    pub average_ticket: Decimal,
    pub first_order_at: Option<DateTime<Utc>>,
    pub last_order_at: Option<DateTime<Utc>>,
}

impl CustomerStats {
    pub fn new(
        customer_id: Uuid,
        order_count: i64,
        total_spent: Decimal,
        first_order_at: Option<DateTime<Utc>>,
        last_order_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            customer_id,
            order_count,
            total_spent,
            average_ticket: Self::average(total_spent, order_count),
            first_order_at,
            last_order_at,
        }
    }

    /// Average ticket, zero when there are no orders
    pub fn average(total: Decimal, count: i64) -> Decimal {
        if count <= 0 {
            return Decimal::ZERO;
        }
        (total / Decimal::from(count)).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// Strip everything but digits, so phone numbers typed differently match
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(11) 98765-4321"), "11987654321");
        assert_eq!(normalize_phone("+55 11 98765 4321"), "5511987654321");
        assert_eq!(normalize_phone("abc"), "");
    }

    #[test]
    fn test_average_ticket() {
        assert_eq!(CustomerStats::average(Decimal::from(100), 0), Decimal::ZERO);
        assert_eq!(CustomerStats::average(Decimal::from(100), 3), Decimal::from_str("33.33").unwrap());
        assert_eq!(CustomerStats::average(Decimal::from(5), 2), Decimal::from_str("2.5").unwrap());
    }
}
