//! Staff member management

use serde::Deserialize;
use shared::models::{StaffMember, StaffRole};
use shared::validation::{validate_email, validate_phone, validate_required};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::auth::hash_password;
use crate::services::subscription::plan_limits;

const STAFF_COLUMNS: &str =
    "id, establishment_id, name, email, phone, role, is_active, last_login_at, created_at";

#[derive(Clone)]
pub struct StaffService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct CreateStaffInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub role: StaffRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStaffInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<StaffRole>,
    pub is_active: Option<bool>,
}

/// Rules on who may be changed or removed
fn check_staff_change(
    acting_user_id: Uuid,
    target: &StaffMember,
    new_role: Option<StaffRole>,
    deactivate: bool,
) -> AppResult<()> {
    if target.role == StaffRole::Owner && (matches!(new_role, Some(r) if r != StaffRole::Owner) || deactivate) {
        return Err(AppError::Conflict {
            resource: "staff".to_string(),
            message: "The owner cannot be demoted or deactivated".to_string(),
        });
    }
    if new_role == Some(StaffRole::Owner) && target.role != StaffRole::Owner {
        return Err(AppError::Conflict {
            resource: "staff".to_string(),
            message: "An establishment has a single owner".to_string(),
        });
    }
    if target.id == acting_user_id && deactivate {
        return Err(AppError::Conflict {
            resource: "staff".to_string(),
            message: "You cannot deactivate your own account".to_string(),
        });
    }
    Ok(())
}

impl StaffService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_staff(&self, establishment_id: Uuid) -> AppResult<Vec<StaffMember>> {
        let staff = sqlx::query_as::<_, StaffMember>(&format!(
            "SELECT {} FROM users WHERE establishment_id = $1 ORDER BY role, name",
            STAFF_COLUMNS
        ))
        .bind(establishment_id)
        .fetch_all(&self.db)
        .await?;
        Ok(staff)
    }

    async fn get_staff(&self, establishment_id: Uuid, user_id: Uuid) -> AppResult<StaffMember> {
        sqlx::query_as::<_, StaffMember>(&format!(
            "SELECT {} FROM users WHERE id = $1 AND establishment_id = $2",
            STAFF_COLUMNS
        ))
        .bind(user_id)
        .bind(establishment_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Staff member".to_string()))
    }

    /// Add a staff member within the plan staff limit
    pub async fn create_staff(&self, establishment_id: Uuid, input: CreateStaffInput) -> AppResult<StaffMember> {
        validate_required(&input.name).map_err(|m| AppError::field("name", m))?;
        validate_email(&input.email).map_err(|m| AppError::field("email", m))?;
        if let Some(phone) = input.phone.as_deref() {
            validate_phone(phone).map_err(|m| AppError::field("phone", m))?;
        }
        if input.role == StaffRole::Owner {
            return Err(AppError::field("role", "An establishment has a single owner"));
        }
        let password_hash = hash_password(&input.password)?;

        let mut tx = self.db.begin().await?;
        let limits = plan_limits(&mut tx, establishment_id).await?;
        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE establishment_id = $1 AND is_active",
        )
        .bind(establishment_id)
        .fetch_one(&mut *tx)
        .await?;
        if !limits.allows_staff(active) {
            return Err(AppError::PlanLimitReached("staff members".to_string()));
        }

        let member = sqlx::query_as::<_, StaffMember>(&format!(
            r#"
            INSERT INTO users (establishment_id, name, email, phone, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            STAFF_COLUMNS
        ))
        .bind(establishment_id)
        .bind(input.name.trim())
        .bind(input.email.trim().to_lowercase())
        .bind(&input.phone)
        .bind(&password_hash)
        .bind(input.role)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(%establishment_id, user_id = %member.id, role = %member.role, "Staff member created");
        Ok(member)
    }

    pub async fn update_staff(
        &self,
        establishment_id: Uuid,
        acting_user_id: Uuid,
        user_id: Uuid,
        input: UpdateStaffInput,
    ) -> AppResult<StaffMember> {
        let target = self.get_staff(establishment_id, user_id).await?;
        check_staff_change(acting_user_id, &target, input.role, input.is_active == Some(false))?;
        if let Some(phone) = input.phone.as_deref() {
            validate_phone(phone).map_err(|m| AppError::field("phone", m))?;
        }

        let member = sqlx::query_as::<_, StaffMember>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                role = COALESCE($5, role),
                is_active = COALESCE($6, is_active)
            WHERE id = $1 AND establishment_id = $2
            RETURNING {}
            "#,
            STAFF_COLUMNS
        ))
        .bind(user_id)
        .bind(establishment_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.phone)
        .bind(input.role)
        .bind(input.is_active)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%establishment_id, %user_id, role = %member.role, active = member.is_active, "Staff member updated");
        Ok(member)
    }

    /// Remove a staff member. The owner and the acting user cannot be removed.
    pub async fn delete_staff(&self, establishment_id: Uuid, acting_user_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let target = self.get_staff(establishment_id, user_id).await?;
        if target.id == acting_user_id {
            return Err(AppError::Conflict {
                resource: "staff".to_string(),
                message: "You cannot remove your own account".to_string(),
            });
        }
        check_staff_change(acting_user_id, &target, None, true)?;

        sqlx::query("DELETE FROM users WHERE id = $1 AND establishment_id = $2")
            .bind(user_id)
            .bind(establishment_id)
            .execute(&self.db)
            .await?;

        tracing::info!(%establishment_id, %user_id, "Staff member removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn member(role: StaffRole) -> StaffMember {
        StaffMember {
            id: Uuid::new_v4(),
            establishment_id: Uuid::nil(),
            name: "Ana".to_string(),
            email: "ana@burger.com".to_string(),
            phone: None,
            role,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_is_protected() {
        let owner = member(StaffRole::Owner);
        let manager = Uuid::new_v4();
        assert!(check_staff_change(manager, &owner, Some(StaffRole::Manager), false).is_err());
        assert!(check_staff_change(manager, &owner, None, true).is_err());
        assert!(check_staff_change(manager, &owner, None, false).is_ok());
    }

    #[test]
    fn test_cannot_promote_to_owner_or_deactivate_self() {
        let attendant = member(StaffRole::Attendant);
        assert!(check_staff_change(Uuid::new_v4(), &attendant, Some(StaffRole::Owner), false).is_err());
        assert!(check_staff_change(attendant.id, &attendant, None, true).is_err());
        assert!(check_staff_change(Uuid::new_v4(), &attendant, Some(StaffRole::Kitchen), true).is_ok());
    }
}
