//! Dining tables and open tabs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{
    DiningTable, Order, OrderStatus, PaymentMethod, TabSummary, TableStatus,
};
use shared::validation::validate_table_number;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::finance::record_order_income;
use crate::services::realtime::{ChangeAction, RealtimeHub};

/// Table service
#[derive(Clone)]
pub struct TableService {
    db: PgPool,
    realtime: RealtimeHub,
}

#[derive(Debug, Deserialize)]
pub struct CreateTableInput {
    pub number: i32,
    pub label: Option<String>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTableInput {
    pub number: Option<i32>,
    pub label: Option<String>,
    pub capacity: Option<i32>,
    pub status: Option<TableStatus>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CloseTableInput {
    pub payment_method: PaymentMethod,
}

/// Result of closing a table
#[derive(Debug, Serialize)]
pub struct ClosedTab {
    pub table_id: Uuid,
    pub order_ids: Vec<Uuid>,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct TransferTabInput {
    pub target_table_id: Uuid,
}

/// Load a table of the establishment, locking its row
pub(crate) async fn lock_table(
    conn: &mut PgConnection,
    establishment_id: Uuid,
    table_id: Uuid,
) -> AppResult<DiningTable> {
    sqlx::query_as::<_, DiningTable>(
        "SELECT * FROM dining_tables WHERE id = $1 AND establishment_id = $2 FOR UPDATE",
    )
    .bind(table_id)
    .bind(establishment_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Table".to_string()))
}

/// Mark a table occupied when a tab is opened on it
pub(crate) async fn occupy_table(
    conn: &mut PgConnection,
    establishment_id: Uuid,
    table_id: Uuid,
) -> AppResult<DiningTable> {
    let table = lock_table(conn, establishment_id, table_id).await?;
    if !table.is_active {
        return Err(AppError::field("table_id", "Table is not active"));
    }
    if table.status != TableStatus::Occupied {
        sqlx::query("UPDATE dining_tables SET status = 'occupied' WHERE id = $1")
            .bind(table_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(table)
}

/// Free the table once it has no open tab left. Returns whether it was freed.
pub(crate) async fn release_table_if_idle(conn: &mut PgConnection, table_id: Uuid) -> AppResult<bool> {
    let open: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders WHERE table_id = $1 AND is_open_tab AND status <> 'cancelled'",
    )
    .bind(table_id)
    .fetch_one(&mut *conn)
    .await?;

    if open > 0 {
        return Ok(false);
    }

    let result = sqlx::query(
        "UPDATE dining_tables SET status = 'free' WHERE id = $1 AND status = 'occupied'",
    )
    .bind(table_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn open_tab_orders(conn: &mut PgConnection, table_id: Uuid, lock: bool) -> AppResult<Vec<Order>> {
    let sql = if lock {
        r#"
        SELECT * FROM orders
        WHERE table_id = $1 AND order_type = 'table' AND is_open_tab AND status <> 'cancelled'
        ORDER BY created_at
        FOR UPDATE
        "#
    } else {
        r#"
        SELECT * FROM orders
        WHERE table_id = $1 AND order_type = 'table' AND is_open_tab AND status <> 'cancelled'
        ORDER BY created_at
        "#
    };

    let orders = sqlx::query_as::<_, Order>(sql)
        .bind(table_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(orders)
}

impl TableService {
    pub fn new(db: PgPool, realtime: RealtimeHub) -> Self {
        Self { db, realtime }
    }

    pub async fn list_tables(&self, establishment_id: Uuid) -> AppResult<Vec<DiningTable>> {
        let tables = sqlx::query_as::<_, DiningTable>(
            "SELECT * FROM dining_tables WHERE establishment_id = $1 ORDER BY number",
        )
        .bind(establishment_id)
        .fetch_all(&self.db)
        .await?;
        Ok(tables)
    }

    pub async fn get_table(&self, establishment_id: Uuid, table_id: Uuid) -> AppResult<DiningTable> {
        sqlx::query_as::<_, DiningTable>(
            "SELECT * FROM dining_tables WHERE id = $1 AND establishment_id = $2",
        )
        .bind(table_id)
        .bind(establishment_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Table".to_string()))
    }

    pub async fn create_table(&self, establishment_id: Uuid, input: CreateTableInput) -> AppResult<DiningTable> {
        validate_table_number(input.number).map_err(|m| AppError::field("number", m))?;
        let capacity = input.capacity.unwrap_or(4);
        if capacity < 1 {
            return Err(AppError::field("capacity", "Capacity must be at least 1"));
        }

        let table = sqlx::query_as::<_, DiningTable>(
            r#"
            INSERT INTO dining_tables (establishment_id, number, label, capacity)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(establishment_id)
        .bind(input.number)
        .bind(&input.label)
        .bind(capacity)
        .fetch_one(&self.db)
        .await?;

        self.realtime.notify(establishment_id, "tables", ChangeAction::Insert, table.id);
        Ok(table)
    }

    pub async fn update_table(
        &self,
        establishment_id: Uuid,
        table_id: Uuid,
        input: UpdateTableInput,
    ) -> AppResult<DiningTable> {
        if let Some(number) = input.number {
            validate_table_number(number).map_err(|m| AppError::field("number", m))?;
        }
        if matches!(input.capacity, Some(c) if c < 1) {
            return Err(AppError::field("capacity", "Capacity must be at least 1"));
        }

        let mut tx = self.db.begin().await?;
        let current = lock_table(&mut tx, establishment_id, table_id).await?;

        // Occupancy follows the tabs; only free/reserved can be set by hand
        if let Some(status) = input.status {
            let has_tab = !open_tab_orders(&mut tx, table_id, false).await?.is_empty();
            if status == TableStatus::Occupied || (has_tab && status != current.status) {
                return Err(AppError::Conflict {
                    resource: "table".to_string(),
                    message: "Table occupancy is managed by its open tab".to_string(),
                });
            }
        }

        let table = sqlx::query_as::<_, DiningTable>(
            r#"
            UPDATE dining_tables SET
                number = COALESCE($3, number),
                label = COALESCE($4, label),
                capacity = COALESCE($5, capacity),
                status = COALESCE($6, status),
                is_active = COALESCE($7, is_active)
            WHERE id = $1 AND establishment_id = $2
            RETURNING *
            "#,
        )
        .bind(table_id)
        .bind(establishment_id)
        .bind(input.number)
        .bind(&input.label)
        .bind(input.capacity)
        .bind(input.status)
        .bind(input.is_active)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        self.realtime.notify(establishment_id, "tables", ChangeAction::Update, table_id);
        Ok(table)
    }

    /// Delete a table; only free tables may go
    pub async fn delete_table(&self, establishment_id: Uuid, table_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let table = lock_table(&mut tx, establishment_id, table_id).await?;
        if table.status == TableStatus::Occupied {
            return Err(AppError::Conflict {
                resource: "table".to_string(),
                message: "Occupied tables cannot be deleted".to_string(),
            });
        }

        sqlx::query("DELETE FROM dining_tables WHERE id = $1")
            .bind(table_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.realtime.notify(establishment_id, "tables", ChangeAction::Delete, table_id);
        Ok(())
    }

    /// Open tab summary of a table
    pub async fn get_tab(&self, establishment_id: Uuid, table_id: Uuid) -> AppResult<TabSummary> {
        let table = self.get_table(establishment_id, table_id).await?;
        let mut conn = self.db.acquire().await?;
        let orders = open_tab_orders(&mut conn, table_id, false).await?;
        Ok(TabSummary::from_orders(&table, &orders))
    }

    /// Close a table: settle every open order as paid and served, record one
    /// income row for the combined total and free the table.
    pub async fn close_table(
        &self,
        establishment_id: Uuid,
        table_id: Uuid,
        user_id: Uuid,
        input: CloseTableInput,
    ) -> AppResult<ClosedTab> {
        let mut tx = self.db.begin().await?;
        let table = lock_table(&mut tx, establishment_id, table_id).await?;
        let orders = open_tab_orders(&mut tx, table_id, true).await?;
        let tab = TabSummary::from_orders(&table, &orders);

        if tab.is_empty() {
            return Err(AppError::Conflict {
                resource: "table".to_string(),
                message: format!("{} has no open tab", table.display_name()),
            });
        }

        sqlx::query(
            r#"
            UPDATE orders SET
                payment_status = 'paid',
                payment_method = $2,
                status = $3,
                is_open_tab = FALSE,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = ANY($1)
            "#,
        )
        .bind(&tab.order_ids)
        .bind(input.payment_method)
        .bind(OrderStatus::Served)
        .execute(&mut *tx)
        .await?;

        // One income row for the whole tab, linked to the oldest order
        let anchor = orders
            .first()
            .ok_or_else(|| AppError::Internal("Open tab without orders".to_string()))?;
        record_order_income(
            &mut tx,
            establishment_id,
            anchor.id,
            anchor.order_number,
            tab.total,
            Some(input.payment_method),
            Some(user_id),
        )
        .await?;

        sqlx::query("UPDATE dining_tables SET status = 'free' WHERE id = $1")
            .bind(table_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            %establishment_id,
            %table_id,
            orders = tab.order_count,
            total = %tab.total,
            "Table closed"
        );
        for order_id in &tab.order_ids {
            self.realtime.notify(establishment_id, "orders", ChangeAction::Update, *order_id);
        }
        self.realtime.notify(establishment_id, "tables", ChangeAction::Update, table_id);

        Ok(ClosedTab {
            table_id,
            order_ids: tab.order_ids,
            total: tab.total,
            payment_method: input.payment_method,
        })
    }

    /// Move the open tab of a table to another available table
    pub async fn transfer_tab(
        &self,
        establishment_id: Uuid,
        table_id: Uuid,
        input: TransferTabInput,
    ) -> AppResult<TabSummary> {
        if input.target_table_id == table_id {
            return Err(AppError::field("target_table_id", "Target table must be different"));
        }

        let mut tx = self.db.begin().await?;
        let source = lock_table(&mut tx, establishment_id, table_id).await?;
        let target = lock_table(&mut tx, establishment_id, input.target_table_id).await?;

        if !target.is_active || !target.status.is_available() {
            return Err(AppError::Conflict {
                resource: "table".to_string(),
                message: format!("{} is not available", target.display_name()),
            });
        }

        let orders = open_tab_orders(&mut tx, table_id, true).await?;
        if orders.is_empty() {
            return Err(AppError::Conflict {
                resource: "table".to_string(),
                message: format!("{} has no open tab", source.display_name()),
            });
        }

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        sqlx::query("UPDATE orders SET table_id = $2, updated_at = NOW() WHERE id = ANY($1)")
            .bind(&ids)
            .bind(target.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE dining_tables SET status = 'occupied' WHERE id = $1")
            .bind(target.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE dining_tables SET status = 'free' WHERE id = $1")
            .bind(source.id)
            .execute(&mut *tx)
            .await?;

        let moved = open_tab_orders(&mut tx, target.id, false).await?;
        tx.commit().await?;

        tracing::info!(%establishment_id, from = %source.id, to = %target.id, "Tab transferred");
        self.realtime.notify(establishment_id, "tables", ChangeAction::Update, source.id);
        self.realtime.notify(establishment_id, "tables", ChangeAction::Update, target.id);

        let target = DiningTable {
            status: TableStatus::Occupied,
            ..target
        };
        Ok(TabSummary::from_orders(&target, &moved))
    }
}
