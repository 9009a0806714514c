//! Order management: creation, status flow, payment and item editing
//!
//! Prices are always computed here from the catalog; totals sent by clients
//! are never trusted. Every item edit re-prices the item and recalculates the
//! order in the same transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::{
    validate_addon_selection, validate_order_shape, validate_transition, Addon, AddonGroup,
    AddonGroupWithAddons, AddonSelection, Order, OrderFlowError, OrderItem, OrderItemAddon,
    OrderItemWithAddons, OrderSource, OrderStatus, OrderType, OrderWithItems, PaymentMethod,
    PaymentStatus, Product, ResolvedAddon,
};
use shared::pricing::{change_due, price_line, OrderTotals, PricedLine};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::validate_price;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::finance::record_order_income;
use crate::services::realtime::{ChangeAction, RealtimeHub};
use crate::services::table::{occupy_table, release_table_if_idle};

/// Order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    realtime: RealtimeHub,
}

/// A line requested by a client
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub addons: Vec<AddonSelection>,
    pub notes: Option<String>,
}

/// Input for creating an order from the dashboard
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub order_type: OrderType,
    pub table_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub delivery_address: Option<String>,
    /// Defaults to the establishment delivery fee
    pub delivery_fee: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub notes: Option<String>,
    pub items: Vec<OrderItemInput>,
}

/// Filters for listing orders
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub order_type: Option<OrderType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub open_tabs_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusInput {
    pub status: OrderStatus,
    pub cancel_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentInput {
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub cash_tendered: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderDetailsInput {
    pub notes: Option<String>,
    pub discount: Option<Decimal>,
    pub delivery_fee: Option<Decimal>,
    pub delivery_address: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemInput {
    pub quantity: Option<i32>,
    pub notes: Option<String>,
    /// Replaces the addon selection when present
    pub addons: Option<Vec<AddonSelection>>,
}

/// Everything needed to insert a new order
#[derive(Debug)]
pub(crate) struct NewOrder {
    pub establishment_id: Uuid,
    pub order_type: OrderType,
    pub source: OrderSource,
    pub table_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_fee: Decimal,
    pub discount: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub cash_tendered: Option<Decimal>,
    pub notes: Option<String>,
    pub client_request_id: Option<String>,
}

/// A line priced against the catalog
#[derive(Debug, Clone)]
pub(crate) struct PricedItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub line: PricedLine,
    pub addons: Vec<ResolvedAddon>,
    pub notes: Option<String>,
}

/// Addon groups linked to a product, with their addons
pub(crate) async fn linked_addon_groups(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> AppResult<Vec<AddonGroupWithAddons>> {
    let groups = sqlx::query_as::<_, AddonGroup>(
        r#"
        SELECT g.* FROM addon_groups g
        JOIN product_addon_groups pag ON pag.group_id = g.id
        WHERE pag.product_id = $1
        ORDER BY pag.position, g.position
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    if groups.is_empty() {
        return Ok(Vec::new());
    }

    let group_ids: Vec<Uuid> = groups.iter().map(|g| g.id).collect();
    let addons = sqlx::query_as::<_, Addon>(
        "SELECT * FROM addons WHERE group_id = ANY($1) ORDER BY position, name",
    )
    .bind(&group_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(groups
        .into_iter()
        .map(|group| {
            let addons = addons.iter().filter(|a| a.group_id == group.id).cloned().collect();
            AddonGroupWithAddons { group, addons }
        })
        .collect())
}

/// Price one line from the catalog, enforcing availability and addon rules
pub(crate) async fn price_item(
    conn: &mut PgConnection,
    establishment_id: Uuid,
    input: &OrderItemInput,
) -> AppResult<PricedItem> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE id = $1 AND establishment_id = $2",
    )
    .bind(input.product_id)
    .bind(establishment_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    if !product.is_available {
        return Err(AppError::field(
            "items",
            format!("{} is currently unavailable", product.name),
        ));
    }

    let groups = linked_addon_groups(conn, product.id).await?;
    let addons = validate_addon_selection(&groups, &input.addons)?;
    let line = price_line(product.effective_price(), input.quantity, &addons)?;

    Ok(PricedItem {
        product_id: product.id,
        product_name: product.name,
        line,
        addons,
        notes: input.notes.clone(),
    })
}

async fn insert_item(conn: &mut PgConnection, order_id: Uuid, item: &PricedItem) -> AppResult<OrderItem> {
    let row = sqlx::query_as::<_, OrderItem>(
        r#"
        INSERT INTO order_items
            (order_id, product_id, product_name, unit_price, quantity, addons_total, total_price, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(&item.product_name)
    .bind(item.line.unit_price)
    .bind(item.line.quantity)
    .bind(item.line.addons_total)
    .bind(item.line.total)
    .bind(&item.notes)
    .fetch_one(&mut *conn)
    .await?;

    insert_item_addons(conn, row.id, &item.addons).await?;
    Ok(row)
}

async fn insert_item_addons(
    conn: &mut PgConnection,
    order_item_id: Uuid,
    addons: &[ResolvedAddon],
) -> AppResult<()> {
    for addon in addons {
        sqlx::query(
            r#"
            INSERT INTO order_item_addons (order_item_id, addon_id, addon_name, unit_price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_item_id)
        .bind(addon.addon_id)
        .bind(&addon.name)
        .bind(addon.unit_price)
        .bind(addon.quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Allocate the next sequential order number of the establishment. The row
/// lock serializes concurrent allocations.
async fn next_order_number(conn: &mut PgConnection, establishment_id: Uuid) -> AppResult<i32> {
    let number = sqlx::query_scalar::<_, i32>(
        r#"
        UPDATE establishments SET order_sequence = order_sequence + 1
        WHERE id = $1
        RETURNING order_sequence
        "#,
    )
    .bind(establishment_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Establishment".to_string()))?;
    Ok(number)
}

/// Insert an order with its priced items. Table orders open a tab and
/// occupy the table.
pub(crate) async fn insert_order(
    conn: &mut PgConnection,
    new: NewOrder,
    items: &[PricedItem],
) -> AppResult<Order> {
    validate_order_shape(new.order_type, new.table_id, new.delivery_address.as_deref())?;
    if items.is_empty() {
        return Err(AppError::field("items", "An order needs at least one item"));
    }

    let totals = OrderTotals::compute(
        items.iter().map(|i| i.line.total),
        new.order_type,
        new.delivery_fee,
        new.discount,
    )?;

    if let (Some(PaymentMethod::Cash), Some(tendered)) = (new.payment_method, new.cash_tendered) {
        change_due(totals.total, tendered)?;
    }

    if let Some(table_id) = new.table_id {
        occupy_table(conn, new.establishment_id, table_id).await?;
    }

    let order_number = next_order_number(conn, new.establishment_id).await?;

    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (
            establishment_id, order_number, order_type, source, customer_id, table_id,
            customer_name, customer_phone, delivery_address,
            subtotal, delivery_fee, discount, total,
            payment_method, cash_tendered, notes, is_open_tab, client_request_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING *
        "#,
    )
    .bind(new.establishment_id)
    .bind(order_number)
    .bind(new.order_type)
    .bind(new.source)
    .bind(new.customer_id)
    .bind(new.table_id)
    .bind(&new.customer_name)
    .bind(&new.customer_phone)
    .bind(&new.delivery_address)
    .bind(totals.subtotal)
    .bind(totals.delivery_fee)
    .bind(totals.discount)
    .bind(totals.total)
    .bind(new.payment_method)
    .bind(new.cash_tendered)
    .bind(&new.notes)
    .bind(new.order_type == OrderType::Table)
    .bind(&new.client_request_id)
    .fetch_one(&mut *conn)
    .await?;

    for item in items {
        insert_item(conn, order.id, item).await?;
    }

    Ok(order)
}

/// Items of the given orders with their addons
pub(crate) async fn load_items(
    conn: &mut PgConnection,
    order_ids: &[Uuid],
) -> AppResult<Vec<OrderItemWithAddons>> {
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY created_at, id",
    )
    .bind(order_ids)
    .fetch_all(&mut *conn)
    .await?;

    let item_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    let addons = sqlx::query_as::<_, OrderItemAddon>(
        "SELECT * FROM order_item_addons WHERE order_item_id = ANY($1) ORDER BY addon_name",
    )
    .bind(&item_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items
        .into_iter()
        .map(|item| {
            let addons = addons
                .iter()
                .filter(|a| a.order_item_id == item.id)
                .cloned()
                .collect();
            OrderItemWithAddons { item, addons }
        })
        .collect())
}

pub(crate) async fn load_order_with_items(conn: &mut PgConnection, order: Order) -> AppResult<OrderWithItems> {
    let items = load_items(conn, &[order.id]).await?;
    Ok(OrderWithItems { order, items })
}

async fn lock_order(conn: &mut PgConnection, establishment_id: Uuid, order_id: Uuid) -> AppResult<Order> {
    sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE id = $1 AND establishment_id = $2 FOR UPDATE",
    )
    .bind(order_id)
    .bind(establishment_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

fn ensure_editable(order: &Order) -> AppResult<()> {
    if order.is_editable() {
        Ok(())
    } else {
        Err(OrderFlowError::NotEditable.into())
    }
}

/// Recompute order totals from the stored item lines
async fn recalculate_totals(conn: &mut PgConnection, order: &Order) -> AppResult<Order> {
    let line_totals = sqlx::query_scalar::<_, Decimal>(
        "SELECT total_price FROM order_items WHERE order_id = $1",
    )
    .bind(order.id)
    .fetch_all(&mut *conn)
    .await?;

    let totals = OrderTotals::compute(line_totals, order.order_type, order.delivery_fee, order.discount)?;

    let updated = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders SET subtotal = $2, delivery_fee = $3, discount = $4, total = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(order.id)
    .bind(totals.subtotal)
    .bind(totals.delivery_fee)
    .bind(totals.discount)
    .bind(totals.total)
    .fetch_one(&mut *conn)
    .await?;
    Ok(updated)
}

impl OrderService {
    pub fn new(db: PgPool, realtime: RealtimeHub) -> Self {
        Self { db, realtime }
    }

    /// List orders, newest first
    pub async fn list_orders(
        &self,
        establishment_id: Uuid,
        filter: &OrderFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Order>> {
        const WHERE: &str = r#"
            WHERE establishment_id = $1
              AND ($2::order_status IS NULL OR status = $2)
              AND ($3::order_type IS NULL OR order_type = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
              AND (NOT $6 OR is_open_tab)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders {}", WHERE))
            .bind(establishment_id)
            .bind(filter.status)
            .bind(filter.order_type)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.open_tabs_only)
            .fetch_one(&self.db)
            .await?;

        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT * FROM orders {} ORDER BY created_at DESC LIMIT $7 OFFSET $8",
            WHERE
        ))
        .bind(establishment_id)
        .bind(filter.status)
        .bind(filter.order_type)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.open_tabs_only)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: orders,
            pagination: PaginationMeta::new(pagination, total.max(0) as u64),
        })
    }

    /// Get an order with its items and addons
    pub async fn get_order(&self, establishment_id: Uuid, order_id: Uuid) -> AppResult<OrderWithItems> {
        let mut conn = self.db.acquire().await?;
        let order = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE id = $1 AND establishment_id = $2",
        )
        .bind(order_id)
        .bind(establishment_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        load_order_with_items(&mut conn, order).await
    }

    /// Create an order from the dashboard
    pub async fn create_order(&self, establishment_id: Uuid, input: CreateOrderInput) -> AppResult<OrderWithItems> {
        validate_order_shape(input.order_type, input.table_id, input.delivery_address.as_deref())?;

        let mut tx = self.db.begin().await?;

        let default_fee = sqlx::query_scalar::<_, Decimal>(
            "SELECT default_delivery_fee FROM establishments WHERE id = $1",
        )
        .bind(establishment_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(customer_id) = input.customer_id {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1 AND establishment_id = $2)",
            )
            .bind(customer_id)
            .bind(establishment_id)
            .fetch_one(&mut *tx)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Customer".to_string()));
            }
        }

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            items.push(price_item(&mut tx, establishment_id, item).await?);
        }

        let new = NewOrder {
            establishment_id,
            order_type: input.order_type,
            source: OrderSource::Dashboard,
            table_id: input.table_id,
            customer_id: input.customer_id,
            customer_name: input.customer_name,
            customer_phone: input.customer_phone,
            delivery_address: input.delivery_address,
            delivery_fee: input.delivery_fee.unwrap_or(default_fee),
            discount: input.discount.unwrap_or(Decimal::ZERO),
            payment_method: None,
            cash_tendered: None,
            notes: input.notes,
            client_request_id: None,
        };

        let order = insert_order(&mut tx, new, &items).await?;
        let order = load_order_with_items(&mut tx, order).await?;
        tx.commit().await?;

        tracing::info!(
            %establishment_id,
            order_id = %order.order.id,
            order_number = order.order.order_number,
            order_type = order.order.order_type.as_str(),
            total = %order.order.total,
            "Order created"
        );
        self.realtime.notify(establishment_id, "orders", ChangeAction::Insert, order.order.id);
        if let Some(table_id) = order.order.table_id {
            self.realtime.notify(establishment_id, "tables", ChangeAction::Update, table_id);
        }

        Ok(order)
    }

    /// Move an order along its status flow
    pub async fn update_status(
        &self,
        establishment_id: Uuid,
        order_id: Uuid,
        input: UpdateStatusInput,
    ) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, establishment_id, order_id).await?;

        validate_transition(order.order_type, order.status, input.status)?;

        let cancel_reason = match input.status {
            OrderStatus::Cancelled => {
                let reason = input
                    .cancel_reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| AppError::field("cancel_reason", "A reason is required to cancel"))?;
                Some(reason.to_string())
            }
            _ => None,
        };

        let is_terminal = input.status.is_terminal();
        let updated = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                status = $2,
                cancel_reason = COALESCE($3, cancel_reason),
                completed_at = CASE WHEN $4 THEN NOW() ELSE completed_at END,
                is_open_tab = CASE WHEN $2 = 'cancelled' THEN FALSE ELSE is_open_tab END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(input.status)
        .bind(&cancel_reason)
        .bind(is_terminal)
        .fetch_one(&mut *tx)
        .await?;

        let mut table_freed = false;
        if let (Some(table_id), OrderStatus::Cancelled) = (updated.table_id, updated.status) {
            table_freed = release_table_if_idle(&mut tx, table_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            %establishment_id,
            %order_id,
            from = order.status.as_str(),
            to = updated.status.as_str(),
            "Order status updated"
        );
        self.realtime.notify(establishment_id, "orders", ChangeAction::Update, order_id);
        if let (true, Some(table_id)) = (table_freed, updated.table_id) {
            self.realtime.notify(establishment_id, "tables", ChangeAction::Update, table_id);
        }

        Ok(updated)
    }

    /// Set payment status and method. Marking an order paid records its
    /// income once; paying a table order takes it off the open tab.
    pub async fn update_payment(
        &self,
        establishment_id: Uuid,
        order_id: Uuid,
        user_id: Uuid,
        input: UpdatePaymentInput,
    ) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, establishment_id, order_id).await?;

        if order.status == OrderStatus::Cancelled && input.payment_status == PaymentStatus::Paid {
            return Err(AppError::InvalidStateTransition(
                "Cancelled orders cannot be paid".to_string(),
            ));
        }
        if !order.payment_status.can_change_to(input.payment_status) {
            return Err(AppError::InvalidStateTransition(format!(
                "Payment cannot go from {:?} to {:?}",
                order.payment_status, input.payment_status
            )));
        }

        let method = input.payment_method.or(order.payment_method);
        if input.payment_status == PaymentStatus::Paid && method.is_none() {
            return Err(AppError::field("payment_method", "A payment method is required"));
        }
        if let (Some(PaymentMethod::Cash), Some(tendered)) = (method, input.cash_tendered) {
            change_due(order.total, tendered)?;
        }

        let updated = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                payment_status = $2,
                payment_method = $3,
                cash_tendered = COALESCE($4, cash_tendered),
                is_open_tab = CASE WHEN $2 = 'paid' THEN FALSE ELSE is_open_tab END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(input.payment_status)
        .bind(method)
        .bind(input.cash_tendered)
        .fetch_one(&mut *tx)
        .await?;

        match (order.payment_status, updated.payment_status) {
            (PaymentStatus::Unpaid, PaymentStatus::Paid) => {
                let recorded = record_order_income(
                    &mut tx,
                    establishment_id,
                    order_id,
                    updated.order_number,
                    updated.total,
                    method,
                    Some(user_id),
                )
                .await?;
                if !recorded {
                    tracing::warn!(%order_id, "Order income already recorded");
                }
            }
            (PaymentStatus::Paid, PaymentStatus::Refunded) => {
                sqlx::query(
                    r#"
                    INSERT INTO financial_transactions
                        (establishment_id, kind, category, amount, payment_method, description, order_id, created_by)
                    VALUES ($1, 'expense', 'refunds', $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(establishment_id)
                .bind(updated.total)
                .bind(method)
                .bind(format!("Refund of order #{}", updated.order_number))
                .bind(order_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            }
            _ => {}
        }

        if let (Some(table_id), PaymentStatus::Paid) = (updated.table_id, updated.payment_status) {
            release_table_if_idle(&mut tx, table_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            %establishment_id,
            %order_id,
            payment_status = ?updated.payment_status,
            "Order payment updated"
        );
        self.realtime.notify(establishment_id, "orders", ChangeAction::Update, order_id);

        Ok(updated)
    }

    /// Update notes, discount, delivery fee, address or contact details
    pub async fn update_details(
        &self,
        establishment_id: Uuid,
        order_id: Uuid,
        input: UpdateOrderDetailsInput,
    ) -> AppResult<Order> {
        for (field, value) in [("discount", input.discount), ("delivery_fee", input.delivery_fee)] {
            if let Some(value) = value {
                validate_price(value).map_err(|m| AppError::field(field, m))?;
            }
        }

        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, establishment_id, order_id).await?;
        ensure_editable(&order)?;

        let address = input.delivery_address.clone().or(order.delivery_address.clone());
        validate_order_shape(order.order_type, order.table_id, address.as_deref())?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                notes = COALESCE($2, notes),
                discount = COALESCE($3, discount),
                delivery_fee = COALESCE($4, delivery_fee),
                delivery_address = COALESCE($5, delivery_address),
                customer_name = COALESCE($6, customer_name),
                customer_phone = COALESCE($7, customer_phone),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(&input.notes)
        .bind(input.discount)
        .bind(input.delivery_fee)
        .bind(&input.delivery_address)
        .bind(&input.customer_name)
        .bind(&input.customer_phone)
        .fetch_one(&mut *tx)
        .await?;

        let order = recalculate_totals(&mut tx, &order).await?;
        tx.commit().await?;

        self.realtime.notify(establishment_id, "orders", ChangeAction::Update, order_id);
        Ok(order)
    }

    /// Add a line to an editable order
    pub async fn add_item(
        &self,
        establishment_id: Uuid,
        order_id: Uuid,
        input: OrderItemInput,
    ) -> AppResult<OrderWithItems> {
        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, establishment_id, order_id).await?;
        ensure_editable(&order)?;

        let priced = price_item(&mut tx, establishment_id, &input).await?;
        let item = insert_item(&mut tx, order_id, &priced).await?;
        let order = recalculate_totals(&mut tx, &order).await?;
        let order = load_order_with_items(&mut tx, order).await?;
        tx.commit().await?;

        tracing::info!(%establishment_id, %order_id, item_id = %item.id, "Order item added");
        self.realtime.notify(establishment_id, "order_items", ChangeAction::Insert, item.id);
        self.realtime.notify(establishment_id, "orders", ChangeAction::Update, order_id);
        Ok(order)
    }

    /// Change quantity, notes or addons of a line and re-price it
    pub async fn update_item(
        &self,
        establishment_id: Uuid,
        order_id: Uuid,
        item_id: Uuid,
        input: UpdateItemInput,
    ) -> AppResult<OrderWithItems> {
        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, establishment_id, order_id).await?;
        ensure_editable(&order)?;

        let current = load_items(&mut tx, &[order_id])
            .await?
            .into_iter()
            .find(|i| i.item.id == item_id)
            .ok_or_else(|| AppError::NotFound("Order item".to_string()))?;

        let quantity = input.quantity.unwrap_or(current.item.quantity);
        let notes = input.notes.clone().or(current.item.notes.clone());

        let (unit_price, addons) = match (&input.addons, current.item.product_id) {
            // New addon selection: resolve against the current catalog
            (Some(selection), Some(product_id)) => {
                let priced = price_item(
                    &mut tx,
                    establishment_id,
                    &OrderItemInput {
                        product_id,
                        quantity,
                        addons: selection.clone(),
                        notes: notes.clone(),
                    },
                )
                .await?;
                (priced.line.unit_price, Some(priced.addons))
            }
            (Some(_), None) => {
                return Err(AppError::field(
                    "addons",
                    "The product of this item no longer exists",
                ));
            }
            // Keep the snapshotted prices
            (None, _) => (current.item.unit_price, None),
        };

        let snapshot: Vec<ResolvedAddon> = match &addons {
            Some(resolved) => resolved.clone(),
            None => current
                .addons
                .iter()
                .map(|a| ResolvedAddon {
                    addon_id: a.addon_id.unwrap_or_default(),
                    group_id: Uuid::nil(),
                    name: a.addon_name.clone(),
                    unit_price: a.unit_price,
                    quantity: a.quantity,
                })
                .collect(),
        };
        let line = price_line(unit_price, quantity, &snapshot)?;

        sqlx::query(
            r#"
            UPDATE order_items SET unit_price = $2, quantity = $3, addons_total = $4, total_price = $5, notes = $6
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .bind(line.unit_price)
        .bind(line.quantity)
        .bind(line.addons_total)
        .bind(line.total)
        .bind(&notes)
        .execute(&mut *tx)
        .await?;

        if let Some(resolved) = &addons {
            sqlx::query("DELETE FROM order_item_addons WHERE order_item_id = $1")
                .bind(item_id)
                .execute(&mut *tx)
                .await?;
            insert_item_addons(&mut tx, item_id, resolved).await?;
        }

        let order = recalculate_totals(&mut tx, &order).await?;
        let order = load_order_with_items(&mut tx, order).await?;
        tx.commit().await?;

        self.realtime.notify(establishment_id, "order_items", ChangeAction::Update, item_id);
        self.realtime.notify(establishment_id, "orders", ChangeAction::Update, order_id);
        Ok(order)
    }

    /// Remove a line. The last line of an order cannot be removed; cancel the
    /// order instead.
    pub async fn remove_item(
        &self,
        establishment_id: Uuid,
        order_id: Uuid,
        item_id: Uuid,
    ) -> AppResult<OrderWithItems> {
        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, establishment_id, order_id).await?;
        ensure_editable(&order)?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM order_items WHERE id = $1 AND order_id = $2")
            .bind(item_id)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound("Order item".to_string()));
        }
        if count <= 1 {
            return Err(OrderFlowError::LastItem.into());
        }

        let order = recalculate_totals(&mut tx, &order).await?;
        let order = load_order_with_items(&mut tx, order).await?;
        tx.commit().await?;

        self.realtime.notify(establishment_id, "order_items", ChangeAction::Delete, item_id);
        self.realtime.notify(establishment_id, "orders", ChangeAction::Update, order_id);
        Ok(order)
    }
}
