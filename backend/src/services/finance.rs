//! Financial transactions: manual entries, order income, summaries and CSV export

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{
    FinanceSummary, FinancialTransaction, PaymentMethod, TransactionKind, ORDER_INCOME_CATEGORY,
};
use shared::types::DateRange;
use shared::validation::{validate_price, validate_required};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::realtime::{ChangeAction, RealtimeHub};

/// Finance service
#[derive(Clone)]
pub struct FinanceService {
    db: PgPool,
    realtime: RealtimeHub,
}

/// Filter for listing transactions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub kind: Option<TransactionKind>,
}

/// Input for a manual transaction
#[derive(Debug, Deserialize)]
pub struct CreateTransactionInput {
    pub kind: TransactionKind,
    pub category: String,
    pub amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub description: Option<String>,
    pub occurred_on: Option<NaiveDate>,
}

/// Row written to the CSV export
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    date: NaiveDate,
    kind: &'a str,
    category: &'a str,
    amount: Decimal,
    payment_method: &'a str,
    description: &'a str,
    order_id: String,
}

/// Record the income of a paid order. Returns false when the order already
/// has an income row.
pub(crate) async fn record_order_income(
    conn: &mut PgConnection,
    establishment_id: Uuid,
    order_id: Uuid,
    order_number: i32,
    amount: Decimal,
    payment_method: Option<PaymentMethod>,
    created_by: Option<Uuid>,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO financial_transactions
            (establishment_id, kind, category, amount, payment_method, description, order_id, created_by)
        VALUES ($1, 'income', $2, $3, $4, $5, $6, $7)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(establishment_id)
    .bind(ORDER_INCOME_CATEGORY)
    .bind(amount)
    .bind(payment_method)
    .bind(format!("Order #{}", order_number))
    .bind(order_id)
    .bind(created_by)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

impl FinanceService {
    pub fn new(db: PgPool, realtime: RealtimeHub) -> Self {
        Self { db, realtime }
    }

    /// List transactions, newest first
    pub async fn list_transactions(
        &self,
        establishment_id: Uuid,
        filter: &TransactionFilter,
    ) -> AppResult<Vec<FinancialTransaction>> {
        let transactions = sqlx::query_as::<_, FinancialTransaction>(
            r#"
            SELECT * FROM financial_transactions
            WHERE establishment_id = $1
              AND ($2::date IS NULL OR occurred_on >= $2)
              AND ($3::date IS NULL OR occurred_on <= $3)
              AND ($4::transaction_kind IS NULL OR kind = $4)
            ORDER BY occurred_on DESC, created_at DESC
            "#,
        )
        .bind(establishment_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.kind)
        .fetch_all(&self.db)
        .await?;

        Ok(transactions)
    }

    /// Create a manual transaction
    pub async fn create_transaction(
        &self,
        establishment_id: Uuid,
        user_id: Uuid,
        input: CreateTransactionInput,
    ) -> AppResult<FinancialTransaction> {
        validate_required(&input.category).map_err(|m| AppError::field("category", m))?;
        validate_price(input.amount).map_err(|m| AppError::field("amount", m))?;
        if input.amount.is_zero() {
            return Err(AppError::field("amount", "Amount must be greater than zero"));
        }

        let occurred_on = input.occurred_on.unwrap_or_else(|| Utc::now().date_naive());

        let transaction = sqlx::query_as::<_, FinancialTransaction>(
            r#"
            INSERT INTO financial_transactions
                (establishment_id, kind, category, amount, payment_method, description, occurred_on, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(establishment_id)
        .bind(input.kind)
        .bind(input.category.trim())
        .bind(input.amount)
        .bind(input.payment_method)
        .bind(&input.description)
        .bind(occurred_on)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            %establishment_id,
            transaction_id = %transaction.id,
            kind = transaction.kind.as_str(),
            "Financial transaction recorded"
        );
        self.realtime.notify(
            establishment_id,
            "financial_transactions",
            ChangeAction::Insert,
            transaction.id,
        );

        Ok(transaction)
    }

    /// Delete a manual transaction. Rows generated from orders are immutable.
    pub async fn delete_transaction(&self, establishment_id: Uuid, transaction_id: Uuid) -> AppResult<()> {
        let transaction = sqlx::query_as::<_, FinancialTransaction>(
            "SELECT * FROM financial_transactions WHERE id = $1 AND establishment_id = $2",
        )
        .bind(transaction_id)
        .bind(establishment_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction".to_string()))?;

        if transaction.is_order_linked() {
            return Err(AppError::Conflict {
                resource: "transaction".to_string(),
                message: "Transactions generated from orders cannot be deleted".to_string(),
            });
        }

        sqlx::query("DELETE FROM financial_transactions WHERE id = $1")
            .bind(transaction_id)
            .execute(&self.db)
            .await?;

        self.realtime.notify(
            establishment_id,
            "financial_transactions",
            ChangeAction::Delete,
            transaction_id,
        );
        Ok(())
    }

    /// Summary over a date range (both ends inclusive)
    pub async fn summary(&self, establishment_id: Uuid, range: &DateRange) -> AppResult<FinanceSummary> {
        range.validate().map_err(|m| AppError::field("start_date", m))?;

        let filter = TransactionFilter {
            start_date: Some(range.start),
            end_date: Some(range.end),
            kind: None,
        };
        let transactions = self.list_transactions(establishment_id, &filter).await?;
        Ok(FinanceSummary::from_transactions(&transactions))
    }

    /// Export transactions as CSV
    pub async fn export_csv(&self, establishment_id: Uuid, filter: &TransactionFilter) -> AppResult<String> {
        let transactions = self.list_transactions(establishment_id, filter).await?;
        Self::to_csv(&transactions)
    }

    pub fn to_csv(transactions: &[FinancialTransaction]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);

        for t in transactions {
            wtr.serialize(CsvRow {
                date: t.occurred_on,
                kind: t.kind.as_str(),
                category: &t.category,
                amount: t.amount,
                payment_method: t.payment_method.as_ref().map(|m| m.as_str()).unwrap_or(""),
                description: t.description.as_deref().unwrap_or(""),
                order_id: t.order_id.map(|id| id.to_string()).unwrap_or_default(),
            })
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }

        let data = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;

        String::from_utf8(data).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}
