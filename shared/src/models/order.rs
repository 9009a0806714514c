//! Order models and the order lifecycle state machine
//!
//! Each order subtype (counter, table, delivery) has a fixed status flow.
//! Orders only move forward through their flow, or get cancelled while
//! still active.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Order subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "order_type", rename_all = "snake_case"))]
pub enum OrderType {
    Counter,
    Table,
    Delivery,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Counter => "counter",
            OrderType::Table => "table",
            OrderType::Delivery => "delivery",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderType::Counter => "Counter",
            OrderType::Table => "Table",
            OrderType::Delivery => "Delivery",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(OrderType::Counter),
            "table" => Ok(OrderType::Table),
            "delivery" => Ok(OrderType::Delivery),
            _ => Err("Unknown order type"),
        }
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "order_status", rename_all = "snake_case"))]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Served,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
        OrderStatus::Served,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Served => "served",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Final statuses accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Served | OrderStatus::Delivered | OrderStatus::Cancelled
        )
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or("Unknown order status")
    }
}

/// Payment status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "payment_status", rename_all = "snake_case"))]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    /// Payments only move forward: unpaid to paid, paid to refunded.
    /// Re-submitting the current status is allowed so the method can change.
    pub fn can_change_to(self, to: PaymentStatus) -> bool {
        matches!(
            (self, to),
            (PaymentStatus::Unpaid, PaymentStatus::Unpaid | PaymentStatus::Paid)
                | (PaymentStatus::Paid, PaymentStatus::Paid | PaymentStatus::Refunded)
                | (PaymentStatus::Refunded, PaymentStatus::Refunded)
        )
    }
}

/// How an order was (or will be) paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "payment_method", rename_all = "snake_case"))]
pub enum PaymentMethod {
    Cash,
    Card,
    Pix,
    Voucher,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Voucher => "voucher",
            PaymentMethod::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::Pix => "Pix",
            PaymentMethod::Voucher => "Voucher",
            PaymentMethod::Other => "Other",
        }
    }
}

/// Where an order was placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "order_source", rename_all = "snake_case"))]
pub enum OrderSource {
    Dashboard,
    Storefront,
}

/// An order header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: Uuid,
    pub establishment_id: Uuid,
    /// Sequential per establishment
    pub order_number: i32,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub source: OrderSource,
    pub customer_id: Option<Uuid>,
    pub table_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub delivery_address: Option<String>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    /// Cash handed over, for change calculation
    pub cash_tendered: Option<Decimal>,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub is_open_tab: bool,
    pub client_request_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Items may change while the order is active and unpaid
    pub fn is_editable(&self) -> bool {
        self.status.is_active() && self.payment_status != PaymentStatus::Paid
    }

    pub fn status_label(&self) -> &'static str {
        status_label(self.order_type, self.status)
    }

    pub fn next_status(&self) -> Option<OrderStatus> {
        next_status(self.order_type, self.status)
    }
}

/// A line on an order. Product name and prices are snapshotted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    /// Addon price per unit of the item
    pub addons_total: Decimal,
    pub total_price: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An addon attached to an order line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItemAddon {
    pub id: Uuid,
    pub order_item_id: Uuid,
    pub addon_id: Option<Uuid>,
    pub addon_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemWithAddons {
    #[serde(flatten)]
    pub item: OrderItem,
    pub addons: Vec<OrderItemAddon>,
}

/// An order with its full item tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemWithAddons>,
}

/// Order lifecycle failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderFlowError {
    #[error("Order is already {0}")]
    SameStatus(OrderStatus),

    #[error("Order is {0} and can no longer change status")]
    Terminal(OrderStatus),

    #[error("Status {status} is not part of the {order_type} flow")]
    NotInFlow {
        order_type: OrderType,
        status: OrderStatus,
    },

    #[error("Cannot move order back from {from} to {to}")]
    Backwards { from: OrderStatus, to: OrderStatus },

    #[error("Table orders must reference a table")]
    MissingTable,

    #[error("Only table orders can reference a table")]
    UnexpectedTable,

    #[error("Delivery orders require a delivery address")]
    MissingAddress,

    #[error("Order can no longer be edited")]
    NotEditable,

    #[error("Order must keep at least one item")]
    LastItem,
}

const COUNTER_FLOW: &[OrderStatus] = &[
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::Delivered,
];

const TABLE_FLOW: &[OrderStatus] = &[
    OrderStatus::Pending,
    OrderStatus::Preparing,
    OrderStatus::Served,
];

const DELIVERY_FLOW: &[OrderStatus] = &[
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
];

/// The fixed status flow of an order subtype
pub fn status_flow(order_type: OrderType) -> &'static [OrderStatus] {
    match order_type {
        OrderType::Counter => COUNTER_FLOW,
        OrderType::Table => TABLE_FLOW,
        OrderType::Delivery => DELIVERY_FLOW,
    }
}

/// The status following `current`, if any
pub fn next_status(order_type: OrderType, current: OrderStatus) -> Option<OrderStatus> {
    let flow = status_flow(order_type);
    flow.iter()
        .position(|s| *s == current)
        .and_then(|idx| flow.get(idx + 1))
        .copied()
}

/// Final status of the flow (where a completed order ends up)
pub fn final_status(order_type: OrderType) -> OrderStatus {
    match order_type {
        OrderType::Table => OrderStatus::Served,
        OrderType::Counter | OrderType::Delivery => OrderStatus::Delivered,
    }
}

/// Check a requested status change against the flow of the order subtype.
///
/// Forward moves may skip steps. Cancellation is allowed from any active
/// status.
pub fn validate_transition(
    order_type: OrderType,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<(), OrderFlowError> {
    if from == to {
        return Err(OrderFlowError::SameStatus(from));
    }
    if from.is_terminal() {
        return Err(OrderFlowError::Terminal(from));
    }
    if to == OrderStatus::Cancelled {
        return Ok(());
    }

    let flow = status_flow(order_type);
    let position = |status: OrderStatus| {
        flow.iter()
            .position(|s| *s == status)
            .ok_or(OrderFlowError::NotInFlow { order_type, status })
    };

    if position(to)? < position(from)? {
        return Err(OrderFlowError::Backwards { from, to });
    }
    Ok(())
}

/// Human label of a status for the given subtype
pub fn status_label(order_type: OrderType, status: OrderStatus) -> &'static str {
    match (order_type, status) {
        (_, OrderStatus::Pending) => "Pending",
        (_, OrderStatus::Confirmed) => "Confirmed",
        (_, OrderStatus::Preparing) => "Preparing",
        (OrderType::Counter, OrderStatus::Ready) => "Ready for pickup",
        (_, OrderStatus::Ready) => "Ready",
        (_, OrderStatus::OutForDelivery) => "Out for delivery",
        (_, OrderStatus::Served) => "Served",
        (OrderType::Counter, OrderStatus::Delivered) => "Picked up",
        (_, OrderStatus::Delivered) => "Delivered",
        (_, OrderStatus::Cancelled) => "Cancelled",
    }
}

/// Check which references an order of the given subtype needs
pub fn validate_order_shape(
    order_type: OrderType,
    table_id: Option<Uuid>,
    delivery_address: Option<&str>,
) -> Result<(), OrderFlowError> {
    match order_type {
        OrderType::Table if table_id.is_none() => Err(OrderFlowError::MissingTable),
        OrderType::Counter | OrderType::Delivery if table_id.is_some() => {
            Err(OrderFlowError::UnexpectedTable)
        }
        OrderType::Delivery
            if delivery_address.map(str::trim).unwrap_or_default().is_empty() =>
        {
            Err(OrderFlowError::MissingAddress)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_flows_start_pending_and_end_terminal() {
        for order_type in [OrderType::Counter, OrderType::Table, OrderType::Delivery] {
            let flow = status_flow(order_type);
            assert_eq!(flow.first(), Some(&OrderStatus::Pending));
            assert_eq!(flow.last(), Some(&final_status(order_type)));
            assert!(flow[..flow.len() - 1].iter().all(|s| s.is_active()));
        }
    }

    #[test]
    fn test_next_status_follows_flow() {
        assert_eq!(
            next_status(OrderType::Delivery, OrderStatus::Ready),
            Some(OrderStatus::OutForDelivery)
        );
        assert_eq!(
            next_status(OrderType::Counter, OrderStatus::Ready),
            Some(OrderStatus::Delivered)
        );
        assert_eq!(
            next_status(OrderType::Table, OrderStatus::Pending),
            Some(OrderStatus::Preparing)
        );
        assert_eq!(next_status(OrderType::Table, OrderStatus::Served), None);
        assert_eq!(next_status(OrderType::Table, OrderStatus::Confirmed), None);
    }

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(validate_transition(OrderType::Delivery, OrderStatus::Pending, OrderStatus::Confirmed).is_ok());
        assert!(validate_transition(OrderType::Delivery, OrderStatus::Pending, OrderStatus::Delivered).is_ok());
        assert!(validate_transition(OrderType::Table, OrderStatus::Preparing, OrderStatus::Served).is_ok());
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        assert_eq!(
            validate_transition(OrderType::Counter, OrderStatus::Ready, OrderStatus::Preparing),
            Err(OrderFlowError::Backwards {
                from: OrderStatus::Ready,
                to: OrderStatus::Preparing
            })
        );
        assert_eq!(
            validate_transition(OrderType::Counter, OrderStatus::Ready, OrderStatus::OutForDelivery),
            Err(OrderFlowError::NotInFlow {
                order_type: OrderType::Counter,
                status: OrderStatus::OutForDelivery
            })
        );
        assert_eq!(
            validate_transition(OrderType::Table, OrderStatus::Pending, OrderStatus::Pending),
            Err(OrderFlowError::SameStatus(OrderStatus::Pending))
        );
        assert_eq!(
            validate_transition(OrderType::Delivery, OrderStatus::Delivered, OrderStatus::Cancelled),
            Err(OrderFlowError::Terminal(OrderStatus::Delivered))
        );
    }

    #[test]
    fn test_cancel_from_active_statuses() {
        for status in status_flow(OrderType::Delivery).iter().filter(|s| s.is_active()) {
            assert!(validate_transition(OrderType::Delivery, *status, OrderStatus::Cancelled).is_ok());
        }
        assert!(validate_transition(OrderType::Table, OrderStatus::Cancelled, OrderStatus::Pending).is_err());
    }

    #[test]
    fn test_payment_status_only_moves_forward() {
        assert!(PaymentStatus::Unpaid.can_change_to(PaymentStatus::Paid));
        assert!(PaymentStatus::Paid.can_change_to(PaymentStatus::Refunded));
        assert!(PaymentStatus::Paid.can_change_to(PaymentStatus::Paid));
        assert!(!PaymentStatus::Paid.can_change_to(PaymentStatus::Unpaid));
        assert!(!PaymentStatus::Unpaid.can_change_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Refunded.can_change_to(PaymentStatus::Unpaid));
        assert!(!PaymentStatus::Refunded.can_change_to(PaymentStatus::Paid));
    }

    #[test]
    fn test_status_labels_depend_on_subtype() {
        assert_eq!(status_label(OrderType::Counter, OrderStatus::Delivered), "Picked up");
        assert_eq!(status_label(OrderType::Delivery, OrderStatus::Delivered), "Delivered");
        assert_eq!(status_label(OrderType::Counter, OrderStatus::Ready), "Ready for pickup");
        assert_eq!(status_label(OrderType::Table, OrderStatus::Served), "Served");
    }

    #[test]
    fn test_order_shape() {
        let table = Some(Uuid::new_v4());
        assert!(validate_order_shape(OrderType::Table, table, None).is_ok());
        assert_eq!(validate_order_shape(OrderType::Table, None, None), Err(OrderFlowError::MissingTable));
        assert_eq!(
            validate_order_shape(OrderType::Counter, table, None),
            Err(OrderFlowError::UnexpectedTable)
        );
        assert!(validate_order_shape(OrderType::Counter, None, None).is_ok());
        assert_eq!(
            validate_order_shape(OrderType::Delivery, None, Some("   ")),
            Err(OrderFlowError::MissingAddress)
        );
        assert!(validate_order_shape(OrderType::Delivery, None, Some("Main St 10")).is_ok());
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::from_str("archived").is_err());
        assert_eq!(OrderType::from_str("delivery").unwrap(), OrderType::Delivery);
    }
}
