//! Customer records and order statistics

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::{normalize_phone, Customer, CustomerStats};
use shared::validation::{validate_email, validate_phone, validate_required};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::realtime::{ChangeAction, RealtimeHub};

#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
    realtime: RealtimeHub,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub address_reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub address_reference: Option<String>,
    pub notes: Option<String>,
}

fn validate_contact(phone: Option<&str>, email: Option<&str>) -> AppResult<Option<String>> {
    if let Some(email) = email {
        validate_email(email).map_err(|m| AppError::field("email", m))?;
    }
    match phone {
        Some(phone) => {
            validate_phone(phone).map_err(|m| AppError::field("phone", m))?;
            Ok(Some(normalize_phone(phone)))
        }
        None => Ok(None),
    }
}

/// Find the customer with this phone or create one. Known customers get
/// their name and address refreshed.
pub(crate) async fn upsert_by_phone(
    conn: &mut PgConnection,
    establishment_id: Uuid,
    input: &CustomerInput,
) -> AppResult<Customer> {
    validate_required(&input.name).map_err(|m| AppError::field("customer_name", m))?;
    let phone = validate_contact(input.phone.as_deref(), input.email.as_deref())?
        .ok_or_else(|| AppError::field("customer_phone", "Phone number is required"))?;

    let customer = sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (establishment_id, name, phone, email, address, address_reference)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (establishment_id, phone) DO UPDATE SET
            name = EXCLUDED.name,
            email = COALESCE(EXCLUDED.email, customers.email),
            address = COALESCE(EXCLUDED.address, customers.address),
            address_reference = COALESCE(EXCLUDED.address_reference, customers.address_reference),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(establishment_id)
    .bind(input.name.trim())
    .bind(&phone)
    .bind(&input.email)
    .bind(&input.address)
    .bind(&input.address_reference)
    .fetch_one(&mut *conn)
    .await?;

    Ok(customer)
}

impl CustomerService {
    pub fn new(db: PgPool, realtime: RealtimeHub) -> Self {
        Self { db, realtime }
    }

    /// List customers, optionally matching a name or phone fragment
    pub async fn list_customers(&self, establishment_id: Uuid, search: Option<&str>) -> AppResult<Vec<Customer>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let name_pattern = search.map(|s| format!("%{}%", s));
        let phone_pattern = search
            .map(normalize_phone)
            .filter(|digits| !digits.is_empty())
            .map(|digits| format!("%{}%", digits));

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE establishment_id = $1
              AND ($2::text IS NULL OR name ILIKE $2 OR ($3::text IS NOT NULL AND phone LIKE $3))
            ORDER BY name
            LIMIT 200
            "#,
        )
        .bind(establishment_id)
        .bind(name_pattern)
        .bind(phone_pattern)
        .fetch_all(&self.db)
        .await?;
        Ok(customers)
    }

    pub async fn get_customer(&self, establishment_id: Uuid, customer_id: Uuid) -> AppResult<Customer> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1 AND establishment_id = $2")
            .bind(customer_id)
            .bind(establishment_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Customer".to_string()))
    }

    pub async fn create_customer(&self, establishment_id: Uuid, input: CustomerInput) -> AppResult<Customer> {
        validate_required(&input.name).map_err(|m| AppError::field("name", m))?;
        let phone = validate_contact(input.phone.as_deref(), input.email.as_deref())?;

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (establishment_id, name, phone, email, address, address_reference, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(establishment_id)
        .bind(input.name.trim())
        .bind(phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.address_reference)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        self.realtime.notify(establishment_id, "customers", ChangeAction::Insert, customer.id);
        Ok(customer)
    }

    pub async fn update_customer(
        &self,
        establishment_id: Uuid,
        customer_id: Uuid,
        input: UpdateCustomerInput,
    ) -> AppResult<Customer> {
        if let Some(name) = input.name.as_deref() {
            validate_required(name).map_err(|m| AppError::field("name", m))?;
        }
        let phone = validate_contact(input.phone.as_deref(), input.email.as_deref())?;

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                address = COALESCE($6, address),
                address_reference = COALESCE($7, address_reference),
                notes = COALESCE($8, notes),
                updated_at = NOW()
            WHERE id = $1 AND establishment_id = $2
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(establishment_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.address_reference)
        .bind(&input.notes)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        self.realtime.notify(establishment_id, "customers", ChangeAction::Update, customer_id);
        Ok(customer)
    }

    /// Delete a customer. Their orders keep the snapshotted name and phone.
    pub async fn delete_customer(&self, establishment_id: Uuid, customer_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1 AND establishment_id = $2")
            .bind(customer_id)
            .bind(establishment_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Customer".to_string()));
        }

        self.realtime.notify(establishment_id, "customers", ChangeAction::Delete, customer_id);
        Ok(())
    }

    /// Aggregate the customer's non-cancelled orders
    pub async fn customer_stats(&self, establishment_id: Uuid, customer_id: Uuid) -> AppResult<CustomerStats> {
        self.get_customer(establishment_id, customer_id).await?;

        let (count, total, first, last) =
            sqlx::query_as::<_, (i64, Decimal, Option<DateTime<Utc>>, Option<DateTime<Utc>>)>(
                r#"
                SELECT COUNT(*), COALESCE(SUM(total), 0), MIN(created_at), MAX(created_at)
                FROM orders
                WHERE establishment_id = $1 AND customer_id = $2 AND status <> 'cancelled'
                "#,
            )
            .bind(establishment_id)
            .bind(customer_id)
            .fetch_one(&self.db)
            .await?;

        Ok(CustomerStats::new(customer_id, count, total, first, last))
    }

    pub async fn upsert_by_phone(&self, establishment_id: Uuid, input: CustomerInput) -> AppResult<Customer> {
        let mut conn = self.db.acquire().await?;
        let customer = upsert_by_phone(&mut conn, establishment_id, &input).await?;
        self.realtime.notify(establishment_id, "customers", ChangeAction::Update, customer.id);
        Ok(customer)
    }
}
