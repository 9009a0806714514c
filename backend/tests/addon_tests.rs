//! Addon composition tests
//!
//! Selection rules per group (min, max, repeats), availability, and the
//! product-level catalog rules that feed pricing.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::{
    default_categories, missing_default_categories, validate_addon_selection, validate_group_config, Addon, AddonGroup,
    AddonGroupWithAddons, AddonSelection, AddonSelectionError, Product, DEFAULT_CATEGORIES,
};
use std::str::FromStr;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// A group of `count` addons priced 1.00, 2.00, ...
fn group(name: &str, min: i32, max: i32, allow_repeat: bool, count: i32) -> AddonGroupWithAddons {
    let group_id = Uuid::new_v4();
    let addons = (1..=count)
        .map(|i| Addon {
            id: Uuid::new_v4(),
            group_id,
            establishment_id: Uuid::nil(),
            name: format!("{} {}", name, i),
            price: Decimal::from(i),
            is_available: true,
            position: i,
        })
        .collect();
    AddonGroupWithAddons {
        group: AddonGroup {
            id: group_id,
            establishment_id: Uuid::nil(),
            name: name.to_string(),
            min_selections: min,
            max_selections: max,
            allow_repeat,
            is_active: true,
            position: 0,
            created_at: Utc::now(),
        },
        addons,
    }
}

fn pick(group: &AddonGroupWithAddons, index: usize, quantity: i32) -> AddonSelection {
    AddonSelection {
        addon_id: group.addons[index].id,
        quantity,
    }
}

fn product(price: &str, promo: Option<&str>) -> Product {
    Product {
        id: Uuid::new_v4(),
        establishment_id: Uuid::nil(),
        category_id: None,
        name: "X-Burger".to_string(),
        description: None,
        price: dec(price),
        promotional_price: promo.map(dec),
        image_url: None,
        is_available: true,
        position: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Picking n distinct addons succeeds exactly when min <= n <= max
    /// (max 0 meaning unlimited)
    #[test]
    fn test_selection_count_respects_bounds(
        min in 0i32..4,
        max in 0i32..6,
        picked in 0usize..6,
    ) {
        prop_assume!(max == 0 || min <= max);
        let sauces = group("Sauces", min, max, false, 6);
        let selections: Vec<_> = (0..picked).map(|i| pick(&sauces, i, 1)).collect();

        let result = validate_addon_selection(&[sauces], &selections);
        let n = picked as i32;
        let expected_ok = n >= min && (max == 0 || n <= max);
        prop_assert_eq!(result.is_ok(), expected_ok);
    }

    /// Repeatable groups merge duplicate picks into one resolved addon
    #[test]
    fn test_repeats_merge_quantities(first in 1i32..4, second in 1i32..4) {
        let extras = group("Extras", 0, 0, true, 2);
        let selections = vec![pick(&extras, 0, first), pick(&extras, 0, second)];

        let resolved = validate_addon_selection(&[extras], &selections).unwrap();
        prop_assert_eq!(resolved.len(), 1);
        prop_assert_eq!(resolved[0].quantity, first + second);
    }

    /// Group bounds are valid when non-negative and min <= max (or max unlimited)
    #[test]
    fn test_group_config_validity(min in -2i32..5, max in -2i32..5) {
        let expected_ok = min >= 0 && max >= 0 && (max == 0 || min <= max);
        prop_assert_eq!(validate_group_config(min, max).is_ok(), expected_ok);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_required_group_must_be_chosen() {
        let sizes = group("Size", 1, 1, false, 3);
        assert!(matches!(
            validate_addon_selection(&[sizes], &[]),
            Err(AddonSelectionError::TooFewSelections { min: 1, selected: 0, .. })
        ));
    }

    #[test]
    fn test_repeat_rejected_when_not_allowed() {
        let sauces = group("Sauces", 0, 3, false, 3);
        let selections = vec![pick(&sauces, 1, 1), pick(&sauces, 1, 1)];
        assert!(matches!(
            validate_addon_selection(&[sauces.clone()], &selections),
            Err(AddonSelectionError::RepeatNotAllowed { .. })
        ));
        assert!(matches!(
            validate_addon_selection(&[sauces.clone()], &[pick(&sauces, 0, 2)]),
            Err(AddonSelectionError::RepeatNotAllowed { .. })
        ));
    }

    #[test]
    fn test_unknown_and_unavailable_addons() {
        let mut extras = group("Extras", 0, 0, true, 2);
        let stranger = Uuid::new_v4();
        assert_eq!(
            validate_addon_selection(
                &[extras.clone()],
                &[AddonSelection {
                    addon_id: stranger,
                    quantity: 1
                }]
            ),
            Err(AddonSelectionError::UnknownAddon(stranger))
        );

        extras.addons[1].is_available = false;
        let selection = pick(&extras, 1, 1);
        assert!(matches!(
            validate_addon_selection(&[extras], &[selection]),
            Err(AddonSelectionError::AddonUnavailable { .. })
        ));
    }

    #[test]
    fn test_inactive_group_is_not_required() {
        let mut sizes = group("Size", 1, 1, false, 2);
        sizes.group.is_active = false;
        assert!(validate_addon_selection(&[sizes.clone()], &[]).unwrap().is_empty());

        let selection = pick(&sizes, 0, 1);
        assert!(matches!(
            validate_addon_selection(&[sizes], &[selection]),
            Err(AddonSelectionError::GroupInactive { .. })
        ));
    }

    #[test]
    fn test_resolved_addons_carry_group_and_price() {
        let size = group("Size", 1, 1, false, 3);
        let extras = group("Extras", 0, 2, true, 3);
        let selections = vec![pick(&size, 2, 1), pick(&extras, 0, 2)];

        let resolved = validate_addon_selection(&[size.clone(), extras.clone()], &selections).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].group_id, size.group.id);
        assert_eq!(resolved[0].unit_price, dec("3"));
        assert_eq!(resolved[1].group_id, extras.group.id);
        assert_eq!(resolved[1].quantity, 2);
    }

    #[test]
    fn test_promotional_price_rules() {
        assert_eq!(product("30.00", Some("24.90")).effective_price(), dec("24.90"));
        assert!(product("30.00", Some("24.90")).is_on_promotion());
        // Zero or higher promo prices are ignored
        assert_eq!(product("30.00", Some("0")).effective_price(), dec("30.00"));
        assert_eq!(product("30.00", Some("35.00")).effective_price(), dec("30.00"));
        assert!(!product("30.00", None).is_on_promotion());
    }

    #[test]
    fn test_default_category_seeding_is_idempotent() {
        assert_eq!(missing_default_categories(std::iter::empty()).len(), DEFAULT_CATEGORIES.len());

        let all: Vec<&str> = default_categories().iter().map(|(name, _)| *name).collect();
        assert!(missing_default_categories(all).is_empty());

        let missing = missing_default_categories(vec!["  burgers ", "DRINKS"]);
        assert_eq!(missing.len(), DEFAULT_CATEGORIES.len() - 2);
        assert!(missing.iter().all(|(name, _)| *name != "Burgers" && *name != "Drinks"));

        let positions: Vec<i32> = default_categories().iter().map(|(_, p)| *p).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
