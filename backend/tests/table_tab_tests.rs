//! Table and open tab tests

use chrono::{Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::{
    DiningTable, Order, OrderSource, OrderStatus, OrderType, PaymentStatus, TabSummary, TableStatus,
};
use uuid::Uuid;

fn table(number: i32, label: Option<&str>) -> DiningTable {
    DiningTable {
        id: Uuid::new_v4(),
        establishment_id: Uuid::nil(),
        number,
        label: label.map(String::from),
        capacity: 4,
        status: TableStatus::Occupied,
        is_active: true,
        created_at: Utc::now(),
    }
}

fn tab_order(table: &DiningTable, cents: i64, minutes_ago: i64) -> Order {
    let now = Utc::now();
    let total = Decimal::new(cents, 2);
    Order {
        id: Uuid::new_v4(),
        establishment_id: table.establishment_id,
        order_number: 1,
        order_type: OrderType::Table,
        status: OrderStatus::Preparing,
        payment_status: PaymentStatus::Unpaid,
        payment_method: None,
        source: OrderSource::Dashboard,
        customer_id: None,
        table_id: Some(table.id),
        customer_name: None,
        customer_phone: None,
        delivery_address: None,
        subtotal: total,
        delivery_fee: Decimal::ZERO,
        discount: Decimal::ZERO,
        total,
        cash_tendered: None,
        notes: None,
        cancel_reason: None,
        is_open_tab: true,
        client_request_id: None,
        created_at: now - Duration::minutes(minutes_ago),
        updated_at: now,
        completed_at: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The tab total is the sum of its open orders
    #[test]
    fn test_tab_total_is_sum_of_orders(amounts in prop::collection::vec(1i64..50_000, 1..8)) {
        let t = table(5, None);
        let orders: Vec<Order> = amounts.iter().map(|c| tab_order(&t, *c, 0)).collect();

        let tab = TabSummary::from_orders(&t, &orders);
        let expected: Decimal = amounts.iter().map(|c| Decimal::new(*c, 2)).sum();
        prop_assert_eq!(tab.total, expected);
        prop_assert_eq!(tab.order_count, amounts.len());
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_tab_ignores_closed_cancelled_and_foreign_orders() {
        let t = table(3, None);
        let other = table(4, None);

        let open = tab_order(&t, 4500, 30);
        let mut cancelled = tab_order(&t, 1000, 20);
        cancelled.status = OrderStatus::Cancelled;
        let mut closed = tab_order(&t, 2000, 10);
        closed.is_open_tab = false;
        let foreign = tab_order(&other, 9900, 5);

        let tab = TabSummary::from_orders(&t, &[open.clone(), cancelled, closed, foreign]);
        assert_eq!(tab.order_ids, vec![open.id]);
        assert_eq!(tab.total, Decimal::new(4500, 2));
        assert_eq!(tab.table_name, "Table 3");
    }

    #[test]
    fn test_served_orders_stay_on_the_tab_until_closed() {
        let t = table(6, None);
        let mut served = tab_order(&t, 4000, 40);
        served.status = OrderStatus::Served;
        let preparing = tab_order(&t, 1000, 10);

        let tab = TabSummary::from_orders(&t, &[served.clone(), preparing.clone()]);
        assert_eq!(tab.order_ids, vec![served.id, preparing.id]);
        assert_eq!(tab.total, Decimal::new(5000, 2));
        assert_eq!(tab.opened_at, Some(served.created_at));

        let tab = TabSummary::from_orders(&t, &[served.clone()]);
        assert!(!tab.is_empty());
        assert_eq!(tab.total, Decimal::new(4000, 2));
    }

    #[test]
    fn test_tab_opened_at_is_earliest_order() {
        let t = table(1, Some("Terrace"));
        let early = tab_order(&t, 1000, 90);
        let late = tab_order(&t, 1000, 5);

        let tab = TabSummary::from_orders(&t, &[late, early.clone()]);
        assert_eq!(tab.opened_at, Some(early.created_at));
        assert_eq!(tab.table_name, "Terrace");
    }

    #[test]
    fn test_empty_tab() {
        let t = table(2, Some("  "));
        let tab = TabSummary::from_orders(&t, &[]);
        assert!(tab.is_empty());
        assert_eq!(tab.total, Decimal::ZERO);
        assert_eq!(tab.opened_at, None);
        assert_eq!(tab.table_name, "Table 2");
    }

    #[test]
    fn test_only_unoccupied_tables_receive_transfers() {
        assert!(TableStatus::Free.is_available());
        assert!(TableStatus::Reserved.is_available());
        assert!(!TableStatus::Occupied.is_available());
    }
}
