//! Validation utilities for Delivery Hub forms
//!
//! Used by the backend before persisting, and by the storefront (via WASM)
//! before submitting.

use rust_decimal::Decimal;

use crate::models::normalize_phone;
use crate::pricing::{MAX_LINE_QUANTITY, MONEY_DP};

// ============================================================================
// Account Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format");
    };
    if local.is_empty() || domain.len() < 3 || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Invalid email format");
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Invalid email format");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Validate a phone number: 10 to 13 digits once formatting is stripped
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let digits = normalize_phone(phone);
    if digits.len() < 10 || digits.len() > 13 {
        return Err("Phone number must have between 10 and 13 digits");
    }
    if phone
        .chars()
        .any(|c| !(c.is_ascii_digit() || " ()-+.".contains(c)))
    {
        return Err("Phone number contains invalid characters");
    }
    Ok(())
}

/// Validate a storefront slug (3-48 chars, lowercase alphanumeric and `-`)
pub fn validate_slug(slug: &str) -> Result<(), &'static str> {
    if slug.len() < 3 {
        return Err("Slug must be at least 3 characters");
    }
    if slug.len() > 48 {
        return Err("Slug must be at most 48 characters");
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("Slug must contain only lowercase letters, digits and '-'");
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err("Slug cannot start or end with '-'");
    }
    Ok(())
}

/// Turn a display name into a slug candidate
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug.truncate(48);
    slug.trim_end_matches('-').to_string()
}

// ============================================================================
// Catalog and Order Validations
// ============================================================================

/// Validate a price: non-negative with at most two decimal places
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    if price.normalize().scale() > MONEY_DP {
        return Err("Price can have at most two decimal places");
    }
    Ok(())
}

/// Validate an item quantity
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err("Quantity must be between 1 and 999");
    }
    Ok(())
}

/// Validate a table number
pub fn validate_table_number(number: i32) -> Result<(), &'static str> {
    if !(1..=999).contains(&number) {
        return Err("Table number must be between 1 and 999");
    }
    Ok(())
}

/// Validate a required free-text field
pub fn validate_required(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("This field is required");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("owner@burger.com").is_ok());
        assert!(validate_email("a.b@shop.com.br").is_ok());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("no@domain").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a b@x.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("(11) 98765-4321").is_ok());
        assert!(validate_phone("+55 11 98765 4321").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("11987654321x").is_err());
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("burger-house").is_ok());
        assert!(validate_slug("pizza24").is_ok());
        assert!(validate_slug("ab").is_err());
        assert!(validate_slug("Burger").is_err());
        assert!(validate_slug("-burger").is_err());
        assert!(validate_slug("burger_house").is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Burger House"), "burger-house");
        assert_eq!(slugify("  Pizza & Co.  "), "pizza-co");
        assert_eq!(slugify("Café 24h"), "caf-24h");
        assert!(validate_slug(&slugify("Joe's Diner")).is_ok());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Decimal::from_str("19.90").unwrap()).is_ok());
        assert!(validate_price(Decimal::from_str("19.900").unwrap()).is_ok());
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(Decimal::from_str("-1").unwrap()).is_err());
        assert!(validate_price(Decimal::from_str("1.999").unwrap()).is_err());
    }

    #[test]
    fn test_validate_quantity_and_table_number() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1000).is_err());
        assert!(validate_table_number(12).is_ok());
        assert!(validate_table_number(0).is_err());
    }

    #[test]
    fn test_validate_required() {
        assert!(validate_required("x").is_ok());
        assert!(validate_required("   ").is_err());
    }
}
