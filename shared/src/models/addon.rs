//! Addon models and addon composition rules
//!
//! Addons are optional paid modifiers attached to products. They are organized
//! into reusable named groups, and each group carries min/max selection
//! constraints that are enforced whenever an order item is priced.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::pricing::MAX_LINE_QUANTITY;

/// A reusable named group of addons
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct AddonGroup {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub name: String,
    pub min_selections: i32,
    /// Zero means unlimited
    pub max_selections: i32,
    /// Whether the same addon may be chosen more than once
    pub allow_repeat: bool,
    pub is_active: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl AddonGroup {
    pub fn is_required(&self) -> bool {
        self.min_selections > 0
    }
}

/// A single paid modifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Addon {
    pub id: Uuid,
    pub group_id: Uuid,
    pub establishment_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub is_available: bool,
    pub position: i32,
}

/// An addon group together with its addons
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonGroupWithAddons {
    #[serde(flatten)]
    pub group: AddonGroup,
    pub addons: Vec<Addon>,
}

/// A customer's choice of one addon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonSelection {
    pub addon_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

/// A validated selection, snapshotted for pricing and persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAddon {
    pub addon_id: Uuid,
    pub group_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Addon composition failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddonSelectionError {
    #[error("Addon {0} is not offered for this product")]
    UnknownAddon(Uuid),

    #[error("Addon '{addon}' is currently unavailable")]
    AddonUnavailable { addon: String },

    #[error("Addon group '{group}' is inactive")]
    GroupInactive { group: String },

    #[error("Invalid quantity {quantity} for addon '{addon}'")]
    InvalidQuantity { addon: String, quantity: i32 },

    #[error("Addon '{addon}' cannot be repeated in group '{group}'")]
    RepeatNotAllowed { group: String, addon: String },

    #[error("Group '{group}' requires at least {min} selection(s), got {selected}")]
    TooFewSelections { group: String, min: i32, selected: i32 },

    #[error("Group '{group}' allows at most {max} selection(s), got {selected}")]
    TooManySelections { group: String, max: i32, selected: i32 },

    #[error("Invalid addon group configuration: {0}")]
    InvalidGroupConfig(&'static str),
}

/// Validate the min/max bounds of a group
pub fn validate_group_config(min_selections: i32, max_selections: i32) -> Result<(), AddonSelectionError> {
    if min_selections < 0 {
        return Err(AddonSelectionError::InvalidGroupConfig(
            "min_selections cannot be negative",
        ));
    }
    if max_selections < 0 {
        return Err(AddonSelectionError::InvalidGroupConfig(
            "max_selections cannot be negative",
        ));
    }
    if max_selections > 0 && min_selections > max_selections {
        return Err(AddonSelectionError::InvalidGroupConfig(
            "min_selections cannot exceed max_selections",
        ));
    }
    Ok(())
}

/// Check a product's addon selections against the groups linked to it.
///
/// Duplicate entries for the same addon are merged when the group allows
/// repeats. Returns the resolved addons in selection order.
pub fn validate_addon_selection(
    groups: &[AddonGroupWithAddons],
    selections: &[AddonSelection],
) -> Result<Vec<ResolvedAddon>, AddonSelectionError> {
    let index: HashMap<Uuid, (&AddonGroup, &Addon)> = groups
        .iter()
        .flat_map(|g| g.addons.iter().map(move |a| (a.id, (&g.group, a))))
        .collect();

    let mut resolved: Vec<ResolvedAddon> = Vec::with_capacity(selections.len());
    let mut per_group: HashMap<Uuid, i32> = HashMap::new();

    for selection in selections {
        let (group, addon) = index
            .get(&selection.addon_id)
            .copied()
            .ok_or(AddonSelectionError::UnknownAddon(selection.addon_id))?;

        if !group.is_active {
            return Err(AddonSelectionError::GroupInactive {
                group: group.name.clone(),
            });
        }
        if !addon.is_available {
            return Err(AddonSelectionError::AddonUnavailable {
                addon: addon.name.clone(),
            });
        }
        let invalid_quantity = |quantity: i32| AddonSelectionError::InvalidQuantity {
            addon: addon.name.clone(),
            quantity,
        };
        if !(1..=MAX_LINE_QUANTITY).contains(&selection.quantity) {
            return Err(invalid_quantity(selection.quantity));
        }

        let existing = resolved.iter().position(|r| r.addon_id == addon.id);
        if !group.allow_repeat && (selection.quantity > 1 || existing.is_some()) {
            return Err(AddonSelectionError::RepeatNotAllowed {
                group: group.name.clone(),
                addon: addon.name.clone(),
            });
        }

        match existing {
            Some(i) => {
                let merged = resolved[i].quantity.saturating_add(selection.quantity);
                if merged > MAX_LINE_QUANTITY {
                    return Err(invalid_quantity(merged));
                }
                resolved[i].quantity = merged;
            }
            None => resolved.push(ResolvedAddon {
                addon_id: addon.id,
                group_id: group.id,
                name: addon.name.clone(),
                unit_price: addon.price,
                quantity: selection.quantity,
            }),
        }
        let group_count = per_group.entry(group.id).or_insert(0);
        *group_count = group_count
            .checked_add(selection.quantity)
            .ok_or_else(|| invalid_quantity(i32::MAX))?;
    }

    for g in groups.iter().filter(|g| g.group.is_active) {
        let selected = per_group.get(&g.group.id).copied().unwrap_or(0);
        if selected < g.group.min_selections {
            return Err(AddonSelectionError::TooFewSelections {
                group: g.group.name.clone(),
                min: g.group.min_selections,
                selected,
            });
        }
        if g.group.max_selections > 0 && selected > g.group.max_selections {
            return Err(AddonSelectionError::TooManySelections {
                group: g.group.name.clone(),
                max: g.group.max_selections,
                selected,
            });
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, min: i32, max: i32, allow_repeat: bool) -> AddonGroupWithAddons {
        let establishment_id = Uuid::nil();
        let group_id = Uuid::new_v4();
        let addons = (1..=3)
            .map(|i| Addon {
                id: Uuid::new_v4(),
                group_id,
                establishment_id,
                name: format!("{} {}", name, i),
                price: Decimal::from(i),
                is_available: true,
                position: i,
            })
            .collect();
        AddonGroupWithAddons {
            group: AddonGroup {
                id: group_id,
                establishment_id,
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

    fn pick(g: &AddonGroupWithAddons, idx: usize, quantity: i32) -> AddonSelection {
        AddonSelection {
            addon_id: g.addons[idx].id,
            quantity,
        }
    }

    #[test]
    fn test_optional_group_accepts_empty_selection() {
        let extras = group("Extras", 0, 0, true);
        let result = validate_addon_selection(&[extras], &[]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_required_group_rejects_empty_selection() {
        let bread = group("Bread", 1, 1, false);
        let err = validate_addon_selection(&[bread], &[]).unwrap_err();
        assert!(matches!(err, AddonSelectionError::TooFewSelections { min: 1, selected: 0, .. }));
    }

    #[test]
    fn test_max_selections_enforced() {
        let sauces = group("Sauces", 0, 2, false);
        let picks = [pick(&sauces, 0, 1), pick(&sauces, 1, 1), pick(&sauces, 2, 1)];
        let err = validate_addon_selection(&[sauces], &picks).unwrap_err();
        assert!(matches!(err, AddonSelectionError::TooManySelections { max: 2, selected: 3, .. }));
    }

    #[test]
    fn test_repeat_rules() {
        let bread = group("Bread", 0, 0, false);
        let twice = [pick(&bread, 0, 2)];
        assert!(matches!(
            validate_addon_selection(&[bread.clone()], &twice),
            Err(AddonSelectionError::RepeatNotAllowed { .. })
        ));

        let dup = [pick(&bread, 0, 1), pick(&bread, 0, 1)];
        assert!(matches!(
            validate_addon_selection(&[bread], &dup),
            Err(AddonSelectionError::RepeatNotAllowed { .. })
        ));

        let extras = group("Extras", 0, 5, true);
        let merged = [pick(&extras, 1, 2), pick(&extras, 1, 1)];
        let resolved = validate_addon_selection(&[extras], &merged).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].quantity, 3);
        assert_eq!(resolved[0].unit_price, Decimal::from(2));
    }

    #[test]
    fn test_repeat_counts_toward_max() {
        let extras = group("Extras", 0, 2, true);
        let picks = [pick(&extras, 0, 3)];
        assert!(matches!(
            validate_addon_selection(&[extras], &picks),
            Err(AddonSelectionError::TooManySelections { selected: 3, .. })
        ));
    }

    #[test]
    fn test_unknown_and_unavailable_addons() {
        let mut extras = group("Extras", 0, 0, true);
        let stranger = AddonSelection {
            addon_id: Uuid::new_v4(),
            quantity: 1,
        };
        assert!(matches!(
            validate_addon_selection(&[extras.clone()], &[stranger]),
            Err(AddonSelectionError::UnknownAddon(_))
        ));

        extras.addons[0].is_available = false;
        let picks = [pick(&extras, 0, 1)];
        assert!(matches!(
            validate_addon_selection(&[extras], &picks),
            Err(AddonSelectionError::AddonUnavailable { .. })
        ));
    }

    #[test]
    fn test_inactive_group_is_skipped_but_not_selectable() {
        let mut bread = group("Bread", 1, 1, false);
        bread.group.is_active = false;
        assert!(validate_addon_selection(&[bread.clone()], &[]).is_ok());

        let picks = [pick(&bread, 0, 1)];
        assert!(matches!(
            validate_addon_selection(&[bread], &picks),
            Err(AddonSelectionError::GroupInactive { .. })
        ));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let extras = group("Extras", 0, 0, true);
        let picks = [pick(&extras, 0, 0)];
        assert!(matches!(
            validate_addon_selection(&[extras], &picks),
            Err(AddonSelectionError::InvalidQuantity { quantity: 0, .. })
        ));
    }

    #[test]
    fn test_quantity_upper_bound() {
        let extras = group("Extras", 0, 5, true);
        let huge = [pick(&extras, 0, i32::MAX), pick(&extras, 0, i32::MAX)];
        assert!(matches!(
            validate_addon_selection(&[extras.clone()], &huge),
            Err(AddonSelectionError::InvalidQuantity { quantity: i32::MAX, .. })
        ));

        let over = [pick(&extras, 0, MAX_LINE_QUANTITY + 1)];
        assert!(matches!(
            validate_addon_selection(&[extras.clone()], &over),
            Err(AddonSelectionError::InvalidQuantity { .. })
        ));

        let merged_over = [pick(&extras, 1, MAX_LINE_QUANTITY), pick(&extras, 1, 1)];
        assert!(matches!(
            validate_addon_selection(&[extras], &merged_over),
            Err(AddonSelectionError::InvalidQuantity { quantity, .. }) if quantity == MAX_LINE_QUANTITY + 1
        ));
    }

    #[test]
    fn test_group_config_bounds() {
        assert!(validate_group_config(0, 0).is_ok());
        assert!(validate_group_config(1, 3).is_ok());
        assert!(validate_group_config(4, 0).is_ok());
        assert!(validate_group_config(-1, 0).is_err());
        assert!(validate_group_config(0, -2).is_err());
        assert!(validate_group_config(3, 2).is_err());
    }
}
