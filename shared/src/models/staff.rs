//! Staff members and role permissions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a staff member within an establishment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "staff_role", rename_all = "snake_case"))]
pub enum StaffRole {
    Owner,
    Manager,
    Attendant,
    Kitchen,
    Courier,
}

/// Every resource:action pair known to the platform
pub const ALL_PERMISSIONS: &[&str] = &[
    "establishment:read",
    "establishment:write",
    "catalog:read",
    "catalog:write",
    "orders:read",
    "orders:write",
    "orders:status",
    "orders:payment",
    "tables:read",
    "tables:write",
    "customers:read",
    "customers:write",
    "finance:read",
    "finance:write",
    "staff:read",
    "staff:write",
    "staff:delete",
    "subscription:read",
    "subscription:write",
    "printing:use",
];

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Owner => "owner",
            StaffRole::Manager => "manager",
            StaffRole::Attendant => "attendant",
            StaffRole::Kitchen => "kitchen",
            StaffRole::Courier => "courier",
        }
    }

    /// Permissions granted to the role, as `resource:action` strings
    pub fn permissions(&self) -> Vec<String> {
        let granted: Vec<&str> = match self {
            StaffRole::Owner => ALL_PERMISSIONS.to_vec(),
            StaffRole::Manager => ALL_PERMISSIONS
                .iter()
                .copied()
                .filter(|p| *p != "subscription:write" && *p != "staff:delete")
                .collect(),
            StaffRole::Attendant => vec![
                "establishment:read",
                "catalog:read",
                "orders:read",
                "orders:write",
                "orders:status",
                "orders:payment",
                "tables:read",
                "tables:write",
                "customers:read",
                "customers:write",
                "printing:use",
            ],
            StaffRole::Kitchen | StaffRole::Courier => vec!["orders:read", "orders:status"],
        };
        granted.into_iter().map(String::from).collect()
    }
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user working for an establishment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StaffMember {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: StaffRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_has_everything() {
        assert_eq!(StaffRole::Owner.permissions().len(), ALL_PERMISSIONS.len());
    }

    #[test]
    fn test_manager_cannot_manage_billing_or_remove_staff() {
        let perms = StaffRole::Manager.permissions();
        assert!(perms.contains(&"finance:write".to_string()));
        assert!(!perms.contains(&"subscription:write".to_string()));
        assert!(!perms.contains(&"staff:delete".to_string()));
    }

    #[test]
    fn test_kitchen_and_courier_are_limited() {
        let kitchen = StaffRole::Kitchen.permissions();
        assert_eq!(kitchen, vec!["orders:read".to_string(), "orders:status".to_string()]);

        let courier = StaffRole::Courier.permissions();
        assert_eq!(courier, vec!["orders:read".to_string(), "orders:status".to_string()]);
    }

    #[test]
    fn test_role_permissions_are_known() {
        for role in [
            StaffRole::Owner,
            StaffRole::Manager,
            StaffRole::Attendant,
            StaffRole::Kitchen,
            StaffRole::Courier,
        ] {
            for p in role.permissions() {
                assert!(ALL_PERMISSIONS.contains(&p.as_str()), "{} grants unknown {}", role, p);
            }
        }
    }
}
