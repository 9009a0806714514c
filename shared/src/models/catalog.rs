//! Catalog models: categories and products

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A menu category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Category {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub name: String,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A sellable product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub promotional_price: Option<Decimal>,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Price charged for one unit, before addons
    pub fn effective_price(&self) -> Decimal {
        match self.promotional_price {
            Some(promo) if promo > Decimal::ZERO && promo < self.price => promo,
            _ => self.price,
        }
    }

    pub fn is_on_promotion(&self) -> bool {
        self.effective_price() < self.price
    }
}

/// Categories created for every new establishment, as (name, position)
pub const DEFAULT_CATEGORIES: &[(&str, i32)] = &[
    ("Burgers", 1),
    ("Pizzas", 2),
    ("Portions", 3),
    ("Drinks", 4),
    ("Desserts", 5),
];

pub fn default_categories() -> &'static [(&'static str, i32)] {
    DEFAULT_CATEGORIES
}

/// Default categories that are not already present (case-insensitive)
pub fn missing_default_categories<'a, I>(existing: I) -> Vec<(&'static str, i32)>
where
    I: IntoIterator<Item = &'a str>,
{
    let existing: Vec<String> = existing.into_iter().map(|n| n.trim().to_lowercase()).collect();
    default_categories()
        .iter()
        .filter(|(name, _)| !existing.contains(&name.to_lowercase()))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn product(price: &str, promo: Option<&str>) -> Product {
        Product {
            id: Uuid::new_v4(),
            establishment_id: Uuid::new_v4(),
            category_id: None,
            name: "X-Burger".to_string(),
            description: None,
            price: Decimal::from_str(price).unwrap(),
            promotional_price: promo.map(|p| Decimal::from_str(p).unwrap()),
            image_url: None,
            is_available: true,
            position: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_price_uses_lower_promo() {
        let p = product("25.00", Some("19.90"));
        assert_eq!(p.effective_price(), Decimal::from_str("19.90").unwrap());
        assert!(p.is_on_promotion());
    }

    #[test]
    fn test_effective_price_ignores_invalid_promo() {
        assert_eq!(product("25.00", Some("30.00")).effective_price(), Decimal::from(25));
        assert_eq!(product("25.00", Some("0")).effective_price(), Decimal::from(25));
        assert_eq!(product("25.00", None).effective_price(), Decimal::from(25));
    }

    #[test]
    fn test_missing_default_categories() {
        let all = missing_default_categories(Vec::<&str>::new());
        assert_eq!(all.len(), DEFAULT_CATEGORIES.len());

        let some = missing_default_categories(vec!["burgers", " Drinks "]);
        let names: Vec<&str> = some.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["Pizzas", "Portions", "Desserts"]);
    }
}
