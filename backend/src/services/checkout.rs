//! Public storefront: menu, order placement and order tracking
//!
//! Customers are anonymous here. Orders are attached to a customer record by
//! phone number, and the caller gets back a signed tracking token instead of
//! an id it could enumerate.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use shared::models::{
    status_label, AddonGroupWithAddons, Category, Establishment, Order, OrderSource, OrderStatus,
    OrderType, PaymentMethod, PaymentStatus, Product,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::config::StorefrontConfig;
use crate::error::{AppError, AppResult};
use crate::services::customer::{upsert_by_phone, CustomerInput};
use crate::services::order::{
    insert_order, linked_addon_groups, price_item, NewOrder, OrderItemInput, PricedItem,
};
use crate::services::realtime::{ChangeAction, RealtimeHub};
use crate::services::subscription::ensure_usable;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct CheckoutService {
    db: PgPool,
    realtime: RealtimeHub,
    config: StorefrontConfig,
}

/// Establishment fields safe to show to anonymous visitors
#[derive(Debug, Serialize)]
pub struct PublicEstablishment {
    pub name: String,
    pub slug: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub currency: shared::models::Currency,
    pub default_delivery_fee: Decimal,
    pub min_order_value: Decimal,
    pub is_open: bool,
    pub accepts_delivery: bool,
    pub accepts_pickup: bool,
    pub accepts_table: bool,
}

impl From<&Establishment> for PublicEstablishment {
    fn from(e: &Establishment) -> Self {
        Self {
            name: e.name.clone(),
            slug: e.slug.clone(),
            phone: e.phone.clone(),
            address: e.address.clone(),
            logo_url: e.logo_url.clone(),
            currency: e.currency,
            default_delivery_fee: e.default_delivery_fee,
            min_order_value: e.min_order_value,
            is_open: e.is_open,
            accepts_delivery: e.accepts_delivery,
            accepts_pickup: e.accepts_pickup,
            accepts_table: e.accepts_table,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MenuProduct {
    #[serde(flatten)]
    pub product: Product,
    pub effective_price: Decimal,
    pub addon_groups: Vec<AddonGroupWithAddons>,
}

#[derive(Debug, Serialize)]
pub struct MenuCategory {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<MenuProduct>,
}

#[derive(Debug, Serialize)]
pub struct Storefront {
    pub establishment: PublicEstablishment,
    pub categories: Vec<MenuCategory>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderInput {
    pub order_type: OrderType,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_address: Option<String>,
    pub address_reference: Option<String>,
    /// Table ordering from a QR code on the table
    pub table_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub cash_tendered: Option<Decimal>,
    pub notes: Option<String>,
    pub items: Vec<OrderItemInput>,
    pub client_request_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlacedOrder {
    pub order_id: Uuid,
    pub order_number: i32,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub tracking_token: String,
    pub tracking_url: String,
}

/// Order status as shown on the public tracking page
#[derive(Debug, Serialize)]
pub struct TrackedOrder {
    pub establishment_name: String,
    pub order_number: i32,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub status_label: &'static str,
    pub payment_status: PaymentStatus,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

fn mac_for(secret: &str, order_id: Uuid) -> AppResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("Invalid tracking secret".to_string()))?;
    mac.update(order_id.as_bytes());
    Ok(mac)
}

/// `{order_id}.{base64url(hmac_sha256(order_id))}`
pub fn tracking_token(secret: &str, order_id: Uuid) -> AppResult<String> {
    let signature = mac_for(secret, order_id)?.finalize().into_bytes();
    Ok(format!("{}.{}", order_id, URL_SAFE_NO_PAD.encode(signature)))
}

/// Verify a tracking token and return the order id it was issued for
pub fn verify_tracking_token(secret: &str, token: &str) -> AppResult<Uuid> {
    let invalid = || AppError::NotFound("Order".to_string());

    let (id, signature) = token.split_once('.').ok_or_else(invalid)?;
    let order_id = Uuid::parse_str(id).map_err(|_| invalid())?;
    let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| invalid())?;

    mac_for(secret, order_id)?
        .verify_slice(&signature)
        .map_err(|_| invalid())?;
    Ok(order_id)
}

fn items_subtotal(items: &[PricedItem]) -> Decimal {
    items.iter().map(|i| i.line.total).sum()
}

impl CheckoutService {
    pub fn new(db: PgPool, realtime: RealtimeHub, config: StorefrontConfig) -> Self {
        Self { db, realtime, config }
    }

    async fn establishment_by_slug(&self, slug: &str) -> AppResult<Establishment> {
        sqlx::query_as::<_, Establishment>("SELECT * FROM establishments WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Store".to_string()))
    }

    /// Public profile and menu of a store
    pub async fn storefront(&self, slug: &str) -> AppResult<Storefront> {
        let establishment = self.establishment_by_slug(slug).await?;
        let mut conn = self.db.acquire().await?;

        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE establishment_id = $1 AND is_active ORDER BY position, name",
        )
        .bind(establishment.id)
        .fetch_all(&mut *conn)
        .await?;

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE establishment_id = $1 AND is_available
            ORDER BY position, name
            "#,
        )
        .bind(establishment.id)
        .fetch_all(&mut *conn)
        .await?;

        let mut menu_products = Vec::with_capacity(products.len());
        for product in products {
            let addon_groups = linked_addon_groups(&mut conn, product.id)
                .await?
                .into_iter()
                .filter(|g| g.group.is_active)
                .map(|mut g| {
                    g.addons.retain(|a| a.is_available);
                    g
                })
                .collect();
            menu_products.push(MenuProduct {
                effective_price: product.effective_price(),
                product,
                addon_groups,
            });
        }

        let categories = categories
            .into_iter()
            .map(|category| {
                let (mine, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut menu_products)
                    .into_iter()
                    .partition(|p| p.product.category_id == Some(category.id));
                menu_products = rest;
                MenuCategory { category, products: mine }
            })
            .filter(|c| !c.products.is_empty())
            .collect();

        Ok(Storefront {
            establishment: PublicEstablishment::from(&establishment),
            categories,
        })
    }

    /// Place an order from the storefront
    pub async fn place_order(&self, slug: &str, input: PlaceOrderInput) -> AppResult<PlacedOrder> {
        let establishment = self.establishment_by_slug(slug).await?;

        if !establishment.is_open {
            return Err(AppError::StoreClosed);
        }
        if !establishment.accepts(input.order_type) {
            return Err(AppError::field(
                "order_type",
                format!("{} orders are not accepted", input.order_type.label()),
            ));
        }

        let mut tx = self.db.begin().await?;
        ensure_usable(&mut tx, establishment.id).await?;

        if let Some(request_id) = input.client_request_id.as_deref() {
            let existing = order_for_request(&mut tx, establishment.id, request_id).await?;
            if let Some(order) = existing {
                tracing::info!(
                    establishment_id = %establishment.id,
                    order_id = %order.id,
                    "Duplicate checkout request, returning existing order"
                );
                return self.placed(&order);
            }
        }

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            items.push(price_item(&mut tx, establishment.id, item).await?);
        }

        let subtotal = items_subtotal(&items);
        if subtotal < establishment.min_order_value {
            return Err(AppError::field(
                "items",
                format!(
                    "Minimum order value is {}",
                    establishment.currency.format(establishment.min_order_value)
                ),
            ));
        }

        let customer = upsert_by_phone(
            &mut tx,
            establishment.id,
            &CustomerInput {
                name: input.customer_name.clone(),
                phone: Some(input.customer_phone.clone()),
                email: None,
                address: input.delivery_address.clone(),
                address_reference: input.address_reference.clone(),
                notes: None,
            },
        )
        .await?;

        let delivery_fee = if input.order_type == OrderType::Delivery {
            establishment.default_delivery_fee
        } else {
            Decimal::ZERO
        };

        let new = NewOrder {
            establishment_id: establishment.id,
            order_type: input.order_type,
            source: OrderSource::Storefront,
            table_id: input.table_id,
            customer_id: Some(customer.id),
            customer_name: Some(customer.name.clone()),
            customer_phone: customer.phone.clone(),
            delivery_address: input.delivery_address,
            delivery_fee,
            discount: Decimal::ZERO,
            payment_method: Some(input.payment_method),
            cash_tendered: input.cash_tendered,
            notes: input.notes,
            client_request_id: input.client_request_id.clone(),
        };

        let order = match insert_order(&mut tx, new, &items).await {
            Ok(order) => order,
            Err(err) if is_request_replay(&err) => {
                // A concurrent request with the same key won the insert
                tx.rollback().await?;
                let request_id = input.client_request_id.as_deref().unwrap_or_default();
                let mut conn = self.db.acquire().await?;
                let order = order_for_request(&mut conn, establishment.id, request_id)
                    .await?
                    .ok_or(err)?;
                tracing::info!(
                    establishment_id = %establishment.id,
                    order_id = %order.id,
                    "Concurrent checkout request, returning existing order"
                );
                return self.placed(&order);
            }
            Err(err) => return Err(err),
        };
        tx.commit().await?;

        tracing::info!(
            establishment_id = %establishment.id,
            order_id = %order.id,
            order_number = order.order_number,
            total = %order.total,
            "Storefront order placed"
        );
        self.realtime.notify(establishment.id, "orders", ChangeAction::Insert, order.id);
        self.realtime.notify(establishment.id, "customers", ChangeAction::Update, customer.id);
        if let Some(table_id) = order.table_id {
            self.realtime.notify(establishment.id, "tables", ChangeAction::Update, table_id);
        }

        self.placed(&order)
    }

    fn placed(&self, order: &Order) -> AppResult<PlacedOrder> {
        let token = tracking_token(&self.config.tracking_secret, order.id)?;
        Ok(PlacedOrder {
            order_id: order.id,
            order_number: order.order_number,
            status: order.status,
            subtotal: order.subtotal,
            delivery_fee: order.delivery_fee,
            discount: order.discount,
            total: order.total,
            tracking_url: format!(
                "{}/track/{}",
                self.config.public_base_url.trim_end_matches('/'),
                token
            ),
            tracking_token: token,
        })
    }

    /// Public order status lookup
    pub async fn track(&self, token: &str) -> AppResult<TrackedOrder> {
        let order_id = verify_tracking_token(&self.config.tracking_secret, token)?;

        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let establishment_name: String =
            sqlx::query_scalar("SELECT name FROM establishments WHERE id = $1")
                .bind(order.establishment_id)
                .fetch_one(&self.db)
                .await?;

        Ok(TrackedOrder {
            establishment_name,
            order_number: order.order_number,
            order_type: order.order_type,
            status: order.status,
            status_label: status_label(order.order_type, order.status),
            payment_status: order.payment_status,
            total: order.total,
            created_at: order.created_at,
            updated_at: order.updated_at,
            completed_at: order.completed_at,
        })
    }
}

const CLIENT_REQUEST_CONSTRAINT: &str = "orders_client_request_key";

/// Whether an insert failed because the idempotency key is already taken
fn is_request_replay(err: &AppError) -> bool {
    matches!(err, AppError::DuplicateEntry(constraint) if constraint == CLIENT_REQUEST_CONSTRAINT)
}

async fn order_for_request(
    conn: &mut PgConnection,
    establishment_id: Uuid,
    request_id: &str,
) -> AppResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE establishment_id = $1 AND client_request_id = $2",
    )
    .bind(establishment_id)
    .bind(request_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
