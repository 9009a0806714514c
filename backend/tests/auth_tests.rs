//! Role permission tests
//!
//! Permissions are `resource:action` strings granted per staff role.

use proptest::prelude::*;
use shared::models::{StaffRole, ALL_PERMISSIONS};

fn role_strategy() -> impl Strategy<Value = StaffRole> {
    prop_oneof![
        Just(StaffRole::Owner),
        Just(StaffRole::Manager),
        Just(StaffRole::Attendant),
        Just(StaffRole::Kitchen),
        Just(StaffRole::Courier),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every granted permission is a known resource:action pair
    #[test]
    fn test_granted_permissions_are_known(role in role_strategy()) {
        for permission in role.permissions() {
            prop_assert!(ALL_PERMISSIONS.contains(&permission.as_str()));
            let (resource, action) = permission.split_once(':').unwrap();
            prop_assert!(!resource.is_empty() && !action.is_empty());
        }
    }

    /// Every role is a subset of the owner
    #[test]
    fn test_owner_is_superset(role in role_strategy()) {
        let owner = StaffRole::Owner.permissions();
        prop_assert!(role.permissions().iter().all(|p| owner.contains(p)));
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn has(role: StaffRole, permission: &str) -> bool {
        role.permissions().iter().any(|p| p == permission)
    }

    #[test]
    fn test_owner_has_all_permissions() {
        assert_eq!(StaffRole::Owner.permissions().len(), ALL_PERMISSIONS.len());
    }

    #[test]
    fn test_manager_cannot_manage_billing_or_remove_staff() {
        assert!(!has(StaffRole::Manager, "subscription:write"));
        assert!(!has(StaffRole::Manager, "staff:delete"));
        assert!(has(StaffRole::Manager, "finance:read"));
        assert!(has(StaffRole::Manager, "staff:write"));
    }

    #[test]
    fn test_attendant_runs_the_floor() {
        for permission in ["orders:write", "orders:payment", "tables:write", "customers:write"] {
            assert!(has(StaffRole::Attendant, permission), "{}", permission);
        }
        assert!(!has(StaffRole::Attendant, "finance:read"));
        assert!(!has(StaffRole::Attendant, "catalog:write"));
    }

    #[test]
    fn test_kitchen_and_courier_only_move_orders() {
        assert!(has(StaffRole::Kitchen, "orders:status"));
        assert!(!has(StaffRole::Kitchen, "orders:payment"));
        assert!(!has(StaffRole::Kitchen, "catalog:read"));
        assert!(!has(StaffRole::Kitchen, "printing:use"));
        assert!(has(StaffRole::Courier, "orders:status"));
        assert!(!has(StaffRole::Courier, "printing:use"));
    }

    #[test]
    fn test_role_strings() {
        assert_eq!(StaffRole::Attendant.as_str(), "attendant");
        assert_eq!(StaffRole::Owner.to_string(), "owner");
    }
}
