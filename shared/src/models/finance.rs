//! Financial transaction models

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CustomerStats, PaymentMethod};

/// Direction of money flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "transaction_kind", rename_all = "snake_case"))]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

/// A ledger entry. Entries linked to an order are created automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct FinancialTransaction {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub kind: TransactionKind,
    pub category: String,
    pub amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub description: Option<String>,
    pub order_id: Option<Uuid>,
    pub occurred_on: NaiveDate,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl FinancialTransaction {
    pub fn is_order_linked(&self) -> bool {
        self.order_id.is_some()
    }
}

/// Category used for automatic order income
pub const ORDER_INCOME_CATEGORY: &str = "sales";

/// Totals over a set of transactions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinanceSummary {
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
    pub order_count: i64,
    pub average_ticket: Decimal,
    /// Income per payment method
    pub by_payment_method: BTreeMap<String, Decimal>,
}

impl FinanceSummary {
    pub fn from_transactions(transactions: &[FinancialTransaction]) -> Self {
        let mut summary = FinanceSummary::default();

        for tx in transactions {
            match tx.kind {
                TransactionKind::Income => {
                    summary.income += tx.amount;
                    if tx.is_order_linked() {
                        summary.order_count += 1;
                    }
                    let method = tx
                        .payment_method
                        .map(|m| m.as_str())
                        .unwrap_or("unspecified")
                        .to_string();
                    *summary.by_payment_method.entry(method).or_insert(Decimal::ZERO) += tx.amount;
                }
                TransactionKind::Expense => summary.expense += tx.amount,
            }
        }

        summary.balance = summary.income - summary.expense;
        let order_income: Decimal = transactions
            .iter()
            .filter(|t| t.kind == TransactionKind::Income && t.is_order_linked())
            .map(|t| t.amount)
            .sum();
        summary.average_ticket = CustomerStats::average(order_income, summary.order_count);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(kind: TransactionKind, amount: i64, method: Option<PaymentMethod>, order: bool) -> FinancialTransaction {
        FinancialTransaction {
            id: Uuid::new_v4(),
            establishment_id: Uuid::nil(),
            kind,
            category: "misc".to_string(),
            amount: Decimal::from(amount),
            payment_method: method,
            description: None,
            order_id: order.then(Uuid::new_v4),
            occurred_on: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_totals() {
        let txs = vec![
            tx(TransactionKind::Income, 40, Some(PaymentMethod::Cash), true),
            tx(TransactionKind::Income, 60, Some(PaymentMethod::Card), true),
            tx(TransactionKind::Income, 10, None, false),
            tx(TransactionKind::Expense, 25, None, false),
        ];
        let summary = FinanceSummary::from_transactions(&txs);

        assert_eq!(summary.income, Decimal::from(110));
        assert_eq!(summary.expense, Decimal::from(25));
        assert_eq!(summary.balance, Decimal::from(85));
        assert_eq!(summary.order_count, 2);
        assert_eq!(summary.average_ticket, Decimal::from(50));
        assert_eq!(summary.by_payment_method.get("cash"), Some(&Decimal::from(40)));
        assert_eq!(summary.by_payment_method.get("unspecified"), Some(&Decimal::from(10)));
    }

    #[test]
    fn test_empty_summary() {
        let summary = FinanceSummary::from_transactions(&[]);
        assert_eq!(summary.balance, Decimal::ZERO);
        assert_eq!(summary.average_ticket, Decimal::ZERO);
        assert!(summary.by_payment_method.is_empty());
    }
}
