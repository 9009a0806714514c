//! Dining tables and open tabs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Order, OrderStatus, OrderType};

/// Occupancy state of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "table_status", rename_all = "snake_case"))]
pub enum TableStatus {
    Free,
    Occupied,
    Reserved,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Free => "free",
            TableStatus::Occupied => "occupied",
            TableStatus::Reserved => "reserved",
        }
    }

    /// Free and reserved tables can receive a transferred tab
    pub fn is_available(&self) -> bool {
        !matches!(self, TableStatus::Occupied)
    }
}

/// A physical table in the establishment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DiningTable {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub number: i32,
    pub label: Option<String>,
    pub capacity: i32,
    pub status: TableStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl DiningTable {
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) if !label.trim().is_empty() => label.clone(),
            _ => format!("Table {}", self.number),
        }
    }
}

/// Combined view of every open order on a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabSummary {
    pub table_id: Uuid,
    pub table_name: String,
    pub order_ids: Vec<Uuid>,
    pub order_count: usize,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub opened_at: Option<DateTime<Utc>>,
}

impl TabSummary {
    /// Combine the open, non-cancelled table orders that belong to `table`
    pub fn from_orders(table: &DiningTable, orders: &[Order]) -> Self {
        let open: Vec<&Order> = orders
            .iter()
            .filter(|o| {
                o.table_id == Some(table.id)
                    && o.order_type == OrderType::Table
                    && o.is_open_tab
                    && o.status != OrderStatus::Cancelled
            })
            .collect();

        Self {
            table_id: table.id,
            table_name: table.display_name(),
            order_ids: open.iter().map(|o| o.id).collect(),
            order_count: open.len(),
            subtotal: open.iter().map(|o| o.subtotal).sum(),
            discount: open.iter().map(|o| o.discount).sum(),
            total: open.iter().map(|o| o.total).sum(),
            opened_at: open.iter().map(|o| o.created_at).min(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderSource, PaymentStatus};

    fn table() -> DiningTable {
        DiningTable {
            id: Uuid::new_v4(),
            establishment_id: Uuid::nil(),
            number: 7,
            label: None,
            capacity: 4,
            status: TableStatus::Occupied,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn tab_order(table_id: Uuid, total: i64, status: OrderStatus, open: bool) -> Order {
        Order {
            id: Uuid::new_v4(),
            establishment_id: Uuid::nil(),
            order_number: 1,
            order_type: OrderType::Table,
            status,
            payment_status: PaymentStatus::Unpaid,
            payment_method: None,
            source: OrderSource::Dashboard,
            customer_id: None,
            table_id: Some(table_id),
            customer_name: None,
            customer_phone: None,
            delivery_address: None,
            subtotal: Decimal::from(total),
            delivery_fee: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::from(total),
            cash_tendered: None,
            notes: None,
            cancel_reason: None,
            is_open_tab: open,
            client_request_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn test_tab_combines_open_orders_only() {
        let t = table();
        let orders = vec![
            tab_order(t.id, 30, OrderStatus::Pending, true),
            tab_order(t.id, 20, OrderStatus::Preparing, true),
            tab_order(t.id, 99, OrderStatus::Cancelled, true),
            tab_order(t.id, 40, OrderStatus::Served, true),
            tab_order(t.id, 50, OrderStatus::Served, false),
            tab_order(Uuid::new_v4(), 11, OrderStatus::Pending, true),
        ];

        let tab = TabSummary::from_orders(&t, &orders);
        assert_eq!(tab.order_count, 3);
        assert_eq!(tab.total, Decimal::from(90));
        assert_eq!(tab.table_name, "Table 7");
        assert!(tab.opened_at.is_some());
    }

    #[test]
    fn test_empty_tab() {
        let t = table();
        let tab = TabSummary::from_orders(&t, &[]);
        assert!(tab.is_empty());
        assert_eq!(tab.total, Decimal::ZERO);
        assert!(tab.opened_at.is_none());
    }

    #[test]
    fn test_display_name_prefers_label() {
        let mut t = table();
        t.label = Some("Terrace 2".to_string());
        assert_eq!(t.display_name(), "Terrace 2");
    }
}
