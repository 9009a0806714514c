//! Today's operational summary

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{CustomerStats, OrderStatus, PaymentStatus};
use shared::types::DateRange;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;

#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub date: NaiveDate,
    pub orders_by_status: BTreeMap<String, i64>,
    pub order_count: i64,
    pub active_orders: i64,
    pub revenue: Decimal,
    pub paid_orders: i64,
    pub average_ticket: Decimal,
    pub open_tabs: i64,
    pub occupied_tables: i64,
}

impl DashboardSummary {
    /// Build the summary from per-status counts and paid order totals
    pub fn from_counts(
        date: NaiveDate,
        status_counts: &[(OrderStatus, i64)],
        revenue: Decimal,
        paid_orders: i64,
        open_tabs: i64,
        occupied_tables: i64,
    ) -> Self {
        let mut orders_by_status: BTreeMap<String, i64> =
            OrderStatus::ALL.iter().map(|s| (s.as_str().to_string(), 0)).collect();
        let mut order_count = 0;
        let mut active_orders = 0;

        for (status, count) in status_counts {
            orders_by_status.insert(status.as_str().to_string(), *count);
            order_count += count;
            if status.is_active() {
                active_orders += count;
            }
        }

        Self {
            date,
            orders_by_status,
            order_count,
            active_orders,
            revenue,
            paid_orders,
            average_ticket: CustomerStats::average(revenue, paid_orders),
            open_tabs,
            occupied_tables,
        }
    }
}

impl DashboardService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Summary of the given day (UTC), today when `None`
    pub async fn summary(&self, establishment_id: Uuid, date: Option<NaiveDate>) -> AppResult<DashboardSummary> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let range = DateRange::day(date);

        let status_counts = sqlx::query_as::<_, (OrderStatus, i64)>(
            r#"
            SELECT status, COUNT(*) FROM orders
            WHERE establishment_id = $1 AND created_at >= $2 AND created_at < $3
            GROUP BY status
            "#,
        )
        .bind(establishment_id)
        .bind(range.starts_at())
        .bind(range.ends_before())
        .fetch_all(&self.db)
        .await?;

        let (revenue, paid_orders) = sqlx::query_as::<_, (Decimal, i64)>(
            r#"
            SELECT COALESCE(SUM(total), 0), COUNT(*) FROM orders
            WHERE establishment_id = $1 AND created_at >= $2 AND created_at < $3
              AND payment_status = $4 AND status <> 'cancelled'
            "#,
        )
        .bind(establishment_id)
        .bind(range.starts_at())
        .bind(range.ends_before())
        .bind(PaymentStatus::Paid)
        .fetch_one(&self.db)
        .await?;

        let (open_tabs, occupied_tables) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(DISTINCT table_id) FROM orders
                 WHERE establishment_id = $1 AND is_open_tab AND status <> 'cancelled'),
                (SELECT COUNT(*) FROM dining_tables
                 WHERE establishment_id = $1 AND status = 'occupied')
            "#,
        )
        .bind(establishment_id)
        .fetch_one(&self.db)
        .await?;

        Ok(DashboardSummary::from_counts(
            date,
            &status_counts,
            revenue,
            paid_orders,
            open_tabs,
            occupied_tables,
        ))
    }
}
