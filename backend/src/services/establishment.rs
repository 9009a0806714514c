//! Establishment profile and settings

use rust_decimal::Decimal;
use shared::models::{Establishment, EstablishmentSettings};
use shared::validation::{validate_phone, validate_price};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::realtime::{ChangeAction, RealtimeHub};

#[derive(Clone)]
pub struct EstablishmentService {
    db: PgPool,
    realtime: RealtimeHub,
}

impl EstablishmentService {
    pub fn new(db: PgPool, realtime: RealtimeHub) -> Self {
        Self { db, realtime }
    }

    pub async fn get(&self, establishment_id: Uuid) -> AppResult<Establishment> {
        sqlx::query_as::<_, Establishment>("SELECT * FROM establishments WHERE id = $1")
            .bind(establishment_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Establishment".to_string()))
    }

    pub async fn get_by_slug(&self, slug: &str) -> AppResult<Establishment> {
        sqlx::query_as::<_, Establishment>("SELECT * FROM establishments WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Establishment".to_string()))
    }

    pub async fn update_settings(
        &self,
        establishment_id: Uuid,
        settings: EstablishmentSettings,
    ) -> AppResult<Establishment> {
        settings.validate()?;
        if let Some(phone) = settings.phone.as_deref() {
            validate_phone(phone).map_err(|m| AppError::field("phone", m))?;
        }
        let money: [(&str, Option<Decimal>); 2] = [
            ("default_delivery_fee", settings.default_delivery_fee),
            ("min_order_value", settings.min_order_value),
        ];
        for (field, value) in money {
            if let Some(value) = value {
                validate_price(value).map_err(|m| AppError::field(field, m))?;
            }
        }

        let establishment = sqlx::query_as::<_, Establishment>(
            r#"
            UPDATE establishments SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                email = COALESCE($4, email),
                address = COALESCE($5, address),
                logo_url = COALESCE($6, logo_url),
                currency = COALESCE($7, currency),
                default_delivery_fee = COALESCE($8, default_delivery_fee),
                min_order_value = COALESCE($9, min_order_value),
                accepts_delivery = COALESCE($10, accepts_delivery),
                accepts_pickup = COALESCE($11, accepts_pickup),
                accepts_table = COALESCE($12, accepts_table),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(establishment_id)
        .bind(&settings.name)
        .bind(&settings.phone)
        .bind(&settings.email)
        .bind(&settings.address)
        .bind(&settings.logo_url)
        .bind(settings.currency)
        .bind(settings.default_delivery_fee)
        .bind(settings.min_order_value)
        .bind(settings.accepts_delivery)
        .bind(settings.accepts_pickup)
        .bind(settings.accepts_table)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Establishment".to_string()))?;

        tracing::info!(%establishment_id, "Establishment settings updated");
        self.realtime
            .notify(establishment_id, "establishments", ChangeAction::Update, establishment_id);
        Ok(establishment)
    }

    /// Open or close the storefront
    pub async fn set_open(&self, establishment_id: Uuid, is_open: bool) -> AppResult<Establishment> {
        let establishment = sqlx::query_as::<_, Establishment>(
            "UPDATE establishments SET is_open = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(establishment_id)
        .bind(is_open)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Establishment".to_string()))?;

        tracing::info!(%establishment_id, is_open, "Storefront availability changed");
        self.realtime
            .notify(establishment_id, "establishments", ChangeAction::Update, establishment_id);
        Ok(establishment)
    }
}
