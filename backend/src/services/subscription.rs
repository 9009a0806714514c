//! Subscription plan management and the usage gate

use chrono::{Duration, Utc};
use serde::Deserialize;
use shared::models::{PlanLimits, Subscription, SubscriptionPlan, SubscriptionStatus};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Billing period granted when a plan is activated
const PERIOD_DAYS: i64 = 30;

#[derive(Clone)]
pub struct SubscriptionService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct ChangePlanInput {
    pub plan: SubscriptionPlan,
}

/// Current subscription of an establishment
pub(crate) async fn current_subscription(
    conn: &mut PgConnection,
    establishment_id: Uuid,
) -> AppResult<Subscription> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE establishment_id = $1")
        .bind(establishment_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription".to_string()))
}

/// Fail unless the establishment may keep operating
pub(crate) async fn ensure_usable(conn: &mut PgConnection, establishment_id: Uuid) -> AppResult<Subscription> {
    let subscription = current_subscription(conn, establishment_id).await?;
    if !subscription.is_usable(Utc::now()) {
        tracing::warn!(%establishment_id, status = ?subscription.status, "Subscription not usable");
        return Err(AppError::SubscriptionInactive);
    }
    Ok(subscription)
}

/// Limits of the current plan
pub(crate) async fn plan_limits(conn: &mut PgConnection, establishment_id: Uuid) -> AppResult<PlanLimits> {
    Ok(current_subscription(conn, establishment_id).await?.plan.limits())
}

impl SubscriptionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get(&self, establishment_id: Uuid) -> AppResult<Subscription> {
        let mut conn = self.db.acquire().await?;
        current_subscription(&mut conn, establishment_id).await
    }

    pub async fn ensure_usable(&self, establishment_id: Uuid) -> AppResult<Subscription> {
        let mut conn = self.db.acquire().await?;
        ensure_usable(&mut conn, establishment_id).await
    }

    /// Switch plan and start a new billing period. Downgrades are refused
    /// while current usage exceeds the new limits.
    pub async fn change_plan(&self, establishment_id: Uuid, input: ChangePlanInput) -> AppResult<Subscription> {
        let mut tx = self.db.begin().await?;
        let current = current_subscription(&mut tx, establishment_id).await?;

        let limits = input.plan.limits();
        let (products, staff): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products WHERE establishment_id = $1),
                (SELECT COUNT(*) FROM users WHERE establishment_id = $1 AND is_active)
            "#,
        )
        .bind(establishment_id)
        .fetch_one(&mut *tx)
        .await?;

        if matches!(limits.max_products, Some(max) if products > max) {
            return Err(AppError::PlanLimitReached("products".to_string()));
        }
        if matches!(limits.max_staff, Some(max) if staff > max) {
            return Err(AppError::PlanLimitReached("staff members".to_string()));
        }

        let period_end = Utc::now() + Duration::days(PERIOD_DAYS);
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions SET
                plan = $2,
                status = $3,
                current_period_end = $4,
                cancelled_at = NULL,
                updated_at = NOW()
            WHERE establishment_id = $1
            RETURNING *
            "#,
        )
        .bind(establishment_id)
        .bind(input.plan)
        .bind(SubscriptionStatus::Active)
        .bind(period_end)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            %establishment_id,
            from = current.plan.as_str(),
            to = subscription.plan.as_str(),
            "Subscription plan changed"
        );
        Ok(subscription)
    }

    pub async fn cancel(&self, establishment_id: Uuid) -> AppResult<Subscription> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions SET status = $2, cancelled_at = NOW(), updated_at = NOW()
            WHERE establishment_id = $1 AND status <> $2
            RETURNING *
            "#,
        )
        .bind(establishment_id)
        .bind(SubscriptionStatus::Cancelled)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Conflict {
            resource: "subscription".to_string(),
            message: "Subscription is already cancelled".to_string(),
        })?;

        tracing::info!(%establishment_id, "Subscription cancelled");
        Ok(subscription)
    }
}
