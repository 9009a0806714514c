//! Form validation and price formatting tests

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::{normalize_phone, Currency};
use shared::validation::*;
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Brazilian mobile numbers, with or without formatting
fn phone_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[1-9]{2}9[0-9]{8}",
        "\\([1-9]{2}\\) 9[0-9]{4}-[0-9]{4}",
        "\\+55 [1-9]{2} 9[0-9]{4} [0-9]{4}",
    ]
}

fn email_strategy() -> impl Strategy<Value = String> {
    "[a-z]{3,10}@[a-z]{3,8}\\.(com|net|com\\.br)"
}

fn slug_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{2,20}(-[a-z0-9]{1,10}){0,2}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_generated_phones_are_valid(phone in phone_strategy()) {
        prop_assert!(validate_phone(&phone).is_ok());
        let digits = normalize_phone(&phone);
        prop_assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generated_emails_are_valid(email in email_strategy()) {
        prop_assert!(validate_email(&email).is_ok());
    }

    #[test]
    fn test_generated_slugs_are_valid(slug in slug_strategy()) {
        prop_assume!(slug.len() >= 3);
        prop_assert!(validate_slug(&slug).is_ok());
    }

    /// slugify always yields something validate_slug accepts, or nothing
    #[test]
    fn test_slugify_output_is_valid_or_empty(name in "[A-Za-z0-9 '&!-]{0,70}") {
        let slug = slugify(&name);
        if slug.len() >= 3 {
            prop_assert!(validate_slug(&slug).is_ok());
        }
    }

    /// Two-decimal prices are accepted, sub-cent ones are not
    #[test]
    fn test_price_scale(cents in 0i64..10_000_000, mills in 1i64..10) {
        prop_assert!(validate_price(Decimal::new(cents, 2)).is_ok());
        prop_assert!(validate_price(Decimal::new(cents * 10 + mills, 3)).is_err());
    }

    /// Formatting keeps the digits of the amount
    #[test]
    fn test_format_keeps_digits(cents in 0i64..100_000_000) {
        let formatted = Currency::Brl.format(Decimal::new(cents, 2));
        let digits: String = formatted.chars().filter(|c| c.is_ascii_digit()).collect();
        let cents_str = cents.to_string();
        prop_assert_eq!(digits.trim_start_matches('0'), cents_str.trim_start_matches('0'));
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_currency_formatting() {
        assert_eq!(Currency::Brl.format(dec("1234.5")), "R$ 1.234,50");
        assert_eq!(Currency::Usd.format(dec("1234.5")), "$1,234.50");
        assert_eq!(Currency::Eur.format(dec("0.005")), "€ 0,01");
        assert_eq!(Currency::Brl.format(dec("-12")), "-R$ 12,00");
        assert_eq!(Currency::Brl.format(dec("1000000")), "R$ 1.000.000,00");
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::from_str("usd"), Ok(Currency::Usd));
        assert!(Currency::from_str("JPY").is_err());
    }

    #[test]
    fn test_phone_rules() {
        assert!(validate_phone("(11) 98765-4321").is_ok());
        assert!(validate_phone("123456789").is_err());
        assert!(validate_phone("12345678901234").is_err());
        assert!(validate_phone("11 98765-43x1").is_err());
    }

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("burger-house").is_ok());
        assert!(validate_slug("ab").is_err());
        assert!(validate_slug("Burger").is_err());
        assert!(validate_slug("-burger").is_err());
        assert!(validate_slug(&"a".repeat(49)).is_err());
        assert_eq!(slugify("  Zé's Burger & Co!  "), "z-s-burger-co");
    }

    #[test]
    fn test_quantity_and_table_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1000).is_err());
        assert!(validate_table_number(0).is_err());
        assert!(validate_table_number(42).is_ok());
    }

    #[test]
    fn test_account_fields() {
        assert!(validate_email("owner@burger.com").is_ok());
        assert!(validate_email("owner@burger").is_err());
        assert!(validate_email("owner @burger.com").is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
        assert!(validate_required("   ").is_err());
    }
}
