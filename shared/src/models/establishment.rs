//! Establishment (merchant tenant) models

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::OrderType;

/// A merchant account. Scopes nearly all other data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Establishment {
    pub id: Uuid,
    pub name: String,
    /// Public storefront path segment
    pub slug: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub currency: Currency,
    pub default_delivery_fee: Decimal,
    pub min_order_value: Decimal,
    pub is_open: bool,
    pub accepts_delivery: bool,
    pub accepts_pickup: bool,
    pub accepts_table: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Establishment {
    /// Whether the storefront may place an order of the given subtype
    pub fn accepts(&self, order_type: OrderType) -> bool {
        match order_type {
            OrderType::Delivery => self.accepts_delivery,
            OrderType::Counter => self.accepts_pickup,
            OrderType::Table => self.accepts_table,
        }
    }
}

/// Settings editable from the dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EstablishmentSettings {
    #[validate(length(min = 2, max = 120))]
    pub name: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    #[validate(url)]
    pub logo_url: Option<String>,
    pub currency: Option<Currency>,
    pub default_delivery_fee: Option<Decimal>,
    pub min_order_value: Option<Decimal>,
    pub accepts_delivery: Option<bool>,
    pub accepts_pickup: Option<bool>,
    pub accepts_table: Option<bool>,
}

/// Currencies supported for price display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "currency_code", rename_all = "UPPERCASE")
)]
pub enum Currency {
    #[default]
    Brl,
    Usd,
    Eur,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Brl => "BRL",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Currency::Brl => "R$ ",
            Currency::Usd => "$",
            Currency::Eur => "€ ",
        }
    }

    /// (thousands separator, decimal separator)
    fn separators(&self) -> (char, char) {
        match self {
            Currency::Usd => (',', '.'),
            Currency::Brl | Currency::Eur => ('.', ','),
        }
    }

    /// Format an amount for display, e.g. `R$ 1.234,56` or `$1,234.56`
    pub fn format(&self, amount: Decimal) -> String {
        let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        rounded = rounded.abs();
        rounded.rescale(2);

        let digits = rounded.to_string();
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
        let (thousands, decimal) = self.separators();

        format!(
            "{}{}{}{}{}",
            if negative { "-" } else { "" },
            self.symbol(),
            group_thousands(int_part, thousands),
            decimal,
            frac_part
        )
    }
}

impl std::str::FromStr for Currency {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BRL" => Ok(Currency::Brl),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            _ => Err("Unsupported currency"),
        }
    }
}

fn group_thousands(digits: &str, sep: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(Currency::Brl.format(dec("1234.56")), "R$ 1.234,56");
        assert_eq!(Currency::Brl.format(dec("0")), "R$ 0,00");
        assert_eq!(Currency::Brl.format(dec("12.5")), "R$ 12,50");
        assert_eq!(Currency::Brl.format(dec("1000000")), "R$ 1.000.000,00");
    }

    #[test]
    fn test_format_usd_and_eur() {
        assert_eq!(Currency::Usd.format(dec("1234.56")), "$1,234.56");
        assert_eq!(Currency::Usd.format(dec("999.999")), "$1,000.00");
        assert_eq!(Currency::Eur.format(dec("45")), "€ 45,00");
    }

    #[test]
    fn test_format_rounding_and_sign() {
        assert_eq!(Currency::Usd.format(dec("0.005")), "$0.01");
        assert_eq!(Currency::Usd.format(dec("-7.25")), "-$7.25");
        assert_eq!(Currency::Brl.format(dec("-0.001")), "R$ 0,00");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!(Currency::from_str("brl").unwrap(), Currency::Brl);
        assert!(Currency::from_str("JPY").is_err());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1", ','), "1");
        assert_eq!(group_thousands("123", ','), "123");
        assert_eq!(group_thousands("1234", ','), "1,234");
        assert_eq!(group_thousands("123456", '.'), "123.456");
    }
}
