//! Addon groups and addons

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::{validate_group_config, Addon, AddonGroup, AddonGroupWithAddons};
use shared::validation::{validate_price, validate_required};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::realtime::{ChangeAction, RealtimeHub};

#[derive(Clone)]
pub struct AddonService {
    db: PgPool,
    realtime: RealtimeHub,
}

#[derive(Debug, Deserialize)]
pub struct CreateAddonGroupInput {
    pub name: String,
    #[serde(default)]
    pub min_selections: i32,
    /// Zero means unlimited
    #[serde(default)]
    pub max_selections: i32,
    #[serde(default)]
    pub allow_repeat: bool,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAddonGroupInput {
    pub name: Option<String>,
    pub min_selections: Option<i32>,
    pub max_selections: Option<i32>,
    pub allow_repeat: Option<bool>,
    pub is_active: Option<bool>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAddonInput {
    pub name: String,
    pub price: Decimal,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAddonInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub is_available: Option<bool>,
    pub position: Option<i32>,
}

impl AddonService {
    pub fn new(db: PgPool, realtime: RealtimeHub) -> Self {
        Self { db, realtime }
    }

    /// All groups of the establishment with their addons
    pub async fn list_groups(&self, establishment_id: Uuid) -> AppResult<Vec<AddonGroupWithAddons>> {
        let groups = sqlx::query_as::<_, AddonGroup>(
            "SELECT * FROM addon_groups WHERE establishment_id = $1 ORDER BY position, name",
        )
        .bind(establishment_id)
        .fetch_all(&self.db)
        .await?;

        let addons = sqlx::query_as::<_, Addon>(
            "SELECT * FROM addons WHERE establishment_id = $1 ORDER BY position, name",
        )
        .bind(establishment_id)
        .fetch_all(&self.db)
        .await?;

        Ok(groups
            .into_iter()
            .map(|group| AddonGroupWithAddons {
                addons: addons.iter().filter(|a| a.group_id == group.id).cloned().collect(),
                group,
            })
            .collect())
    }

    async fn get_group(&self, establishment_id: Uuid, group_id: Uuid) -> AppResult<AddonGroup> {
        sqlx::query_as::<_, AddonGroup>("SELECT * FROM addon_groups WHERE id = $1 AND establishment_id = $2")
            .bind(group_id)
            .bind(establishment_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Addon group".to_string()))
    }

    pub async fn create_group(&self, establishment_id: Uuid, input: CreateAddonGroupInput) -> AppResult<AddonGroup> {
        validate_required(&input.name).map_err(|m| AppError::field("name", m))?;
        validate_group_config(input.min_selections, input.max_selections)?;

        let group = sqlx::query_as::<_, AddonGroup>(
            r#"
            INSERT INTO addon_groups (establishment_id, name, min_selections, max_selections, allow_repeat, position)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, 0))
            RETURNING *
            "#,
        )
        .bind(establishment_id)
        .bind(input.name.trim())
        .bind(input.min_selections)
        .bind(input.max_selections)
        .bind(input.allow_repeat)
        .bind(input.position)
        .fetch_one(&self.db)
        .await?;

        self.realtime.notify(establishment_id, "addon_groups", ChangeAction::Insert, group.id);
        Ok(group)
    }

    pub async fn update_group(
        &self,
        establishment_id: Uuid,
        group_id: Uuid,
        input: UpdateAddonGroupInput,
    ) -> AppResult<AddonGroup> {
        let current = self.get_group(establishment_id, group_id).await?;
        if let Some(name) = input.name.as_deref() {
            validate_required(name).map_err(|m| AppError::field("name", m))?;
        }
        validate_group_config(
            input.min_selections.unwrap_or(current.min_selections),
            input.max_selections.unwrap_or(current.max_selections),
        )?;

        let group = sqlx::query_as::<_, AddonGroup>(
            r#"
            UPDATE addon_groups SET
                name = COALESCE($3, name),
                min_selections = COALESCE($4, min_selections),
                max_selections = COALESCE($5, max_selections),
                allow_repeat = COALESCE($6, allow_repeat),
                is_active = COALESCE($7, is_active),
                position = COALESCE($8, position)
            WHERE id = $1 AND establishment_id = $2
            RETURNING *
            "#,
        )
        .bind(group_id)
        .bind(establishment_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.min_selections)
        .bind(input.max_selections)
        .bind(input.allow_repeat)
        .bind(input.is_active)
        .bind(input.position)
        .fetch_one(&self.db)
        .await?;

        self.realtime.notify(establishment_id, "addon_groups", ChangeAction::Update, group_id);
        Ok(group)
    }

    /// Delete a group; its addons and product links go with it
    pub async fn delete_group(&self, establishment_id: Uuid, group_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM addon_groups WHERE id = $1 AND establishment_id = $2")
            .bind(group_id)
            .bind(establishment_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Addon group".to_string()));
        }

        self.realtime.notify(establishment_id, "addon_groups", ChangeAction::Delete, group_id);
        Ok(())
    }

    pub async fn create_addon(
        &self,
        establishment_id: Uuid,
        group_id: Uuid,
        input: CreateAddonInput,
    ) -> AppResult<Addon> {
        validate_required(&input.name).map_err(|m| AppError::field("name", m))?;
        validate_price(input.price).map_err(|m| AppError::field("price", m))?;
        self.get_group(establishment_id, group_id).await?;

        let addon = sqlx::query_as::<_, Addon>(
            r#"
            INSERT INTO addons (group_id, establishment_id, name, price, position)
            VALUES ($1, $2, $3, $4, COALESCE($5, 0))
            RETURNING *
            "#,
        )
        .bind(group_id)
        .bind(establishment_id)
        .bind(input.name.trim())
        .bind(input.price)
        .bind(input.position)
        .fetch_one(&self.db)
        .await?;

        self.realtime.notify(establishment_id, "addons", ChangeAction::Insert, addon.id);
        Ok(addon)
    }

    pub async fn update_addon(&self, establishment_id: Uuid, addon_id: Uuid, input: UpdateAddonInput) -> AppResult<Addon> {
        if let Some(name) = input.name.as_deref() {
            validate_required(name).map_err(|m| AppError::field("name", m))?;
        }
        if let Some(price) = input.price {
            validate_price(price).map_err(|m| AppError::field("price", m))?;
        }

        let addon = sqlx::query_as::<_, Addon>(
            r#"
            UPDATE addons SET
                name = COALESCE($3, name),
                price = COALESCE($4, price),
                is_available = COALESCE($5, is_available),
                position = COALESCE($6, position)
            WHERE id = $1 AND establishment_id = $2
            RETURNING *
            "#,
        )
        .bind(addon_id)
        .bind(establishment_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.price)
        .bind(input.is_available)
        .bind(input.position)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Addon".to_string()))?;

        self.realtime.notify(establishment_id, "addons", ChangeAction::Update, addon_id);
        Ok(addon)
    }

    pub async fn set_addon_availability(&self, establishment_id: Uuid, addon_id: Uuid, is_available: bool) -> AppResult<Addon> {
        self.update_addon(
            establishment_id,
            addon_id,
            UpdateAddonInput {
                name: None,
                price: None,
                is_available: Some(is_available),
                position: None,
            },
        )
        .await
    }

    pub async fn delete_addon(&self, establishment_id: Uuid, addon_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM addons WHERE id = $1 AND establishment_id = $2")
            .bind(addon_id)
            .bind(establishment_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Addon".to_string()));
        }

        self.realtime.notify(establishment_id, "addons", ChangeAction::Delete, addon_id);
        Ok(())
    }
}
