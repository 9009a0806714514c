//! Finance and customer statistics tests

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::{
    CustomerStats, FinanceSummary, FinancialTransaction, PaymentMethod, TransactionKind,
    ORDER_INCOME_CATEGORY,
};
use shared::types::DateRange;
use std::str::FromStr;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn tx(kind: TransactionKind, amount: &str, method: Option<PaymentMethod>, order: bool) -> FinancialTransaction {
    FinancialTransaction {
        id: Uuid::new_v4(),
        establishment_id: Uuid::nil(),
        kind,
        category: if order {
            ORDER_INCOME_CATEGORY.to_string()
        } else {
            "supplies".to_string()
        },
        amount: dec(amount),
        payment_method: method,
        description: None,
        order_id: order.then(Uuid::new_v4),
        occurred_on: Utc::now().date_naive(),
        created_by: None,
        created_at: Utc::now(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Balance is income minus expense
    #[test]
    fn test_balance_is_income_minus_expense(
        incomes in prop::collection::vec(1i64..100_000, 0..10),
        expenses in prop::collection::vec(1i64..100_000, 0..10),
    ) {
        let mut transactions = Vec::new();
        for cents in &incomes {
            let mut t = tx(TransactionKind::Income, "0", Some(PaymentMethod::Cash), true);
            t.amount = Decimal::new(*cents, 2);
            transactions.push(t);
        }
        for cents in &expenses {
            let mut t = tx(TransactionKind::Expense, "0", None, false);
            t.amount = Decimal::new(*cents, 2);
            transactions.push(t);
        }

        let summary = FinanceSummary::from_transactions(&transactions);
        prop_assert_eq!(summary.balance, summary.income - summary.expense);
        prop_assert_eq!(summary.order_count, incomes.len() as i64);
    }

    /// The average ticket times the count stays within a cent per order
    #[test]
    fn test_average_ticket_close_to_exact(total_cents in 0i64..1_000_000, count in 1i64..50) {
        let total = Decimal::new(total_cents, 2);
        let average = CustomerStats::average(total, count);
        let drift = (average * Decimal::from(count) - total).abs();
        prop_assert!(drift <= Decimal::new(count, 2));
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_summary_by_payment_method() {
        let transactions = vec![
            tx(TransactionKind::Income, "50.00", Some(PaymentMethod::Pix), true),
            tx(TransactionKind::Income, "30.00", Some(PaymentMethod::Cash), true),
            tx(TransactionKind::Income, "20.00", Some(PaymentMethod::Pix), true),
            tx(TransactionKind::Income, "15.00", None, false),
            tx(TransactionKind::Expense, "40.00", None, false),
        ];

        let summary = FinanceSummary::from_transactions(&transactions);
        assert_eq!(summary.income, dec("115.00"));
        assert_eq!(summary.expense, dec("40.00"));
        assert_eq!(summary.balance, dec("75.00"));
        assert_eq!(summary.order_count, 3);
        assert_eq!(summary.average_ticket, dec("33.33"));
        assert_eq!(summary.by_payment_method.get("pix"), Some(&dec("70.00")));
        assert_eq!(summary.by_payment_method.get("unspecified"), Some(&dec("15.00")));
    }

    #[test]
    fn test_order_linked_entries() {
        assert!(tx(TransactionKind::Income, "10.00", None, true).is_order_linked());
        assert!(!tx(TransactionKind::Expense, "10.00", None, false).is_order_linked());
    }

    #[test]
    fn test_customer_stats_without_orders() {
        let stats = CustomerStats::new(Uuid::new_v4(), 0, Decimal::ZERO, None, None);
        assert_eq!(stats.average_ticket, Decimal::ZERO);
    }

    #[test]
    fn test_date_range_validation() {
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        };
        assert!(range.validate().is_ok());

        let inverted = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        };
        assert!(inverted.validate().is_err());

        let day = DateRange::day(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert!(day.starts_at() < day.ends_before());
    }
}
