//! WebAssembly module for the Delivery Hub storefront and dashboard
//!
//! Client-side computation built on the shared crate:
//! - Cart line and total pricing
//! - Addon selection validation
//! - Order status flow and labels
//! - Price formatting and phone normalization

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use shared::models::{
    self as domain, AddonGroupWithAddons, AddonSelection, Currency, OrderStatus, OrderType,
    ResolvedAddon,
};
use shared::pricing::{self, OrderTotals, PricedLine};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("delivery-hub-wasm loaded"));
}

/// One cart line as held by the storefront
#[derive(Debug, Deserialize)]
struct CartLine {
    unit_price: Decimal,
    quantity: i32,
    #[serde(default)]
    addons: Vec<ResolvedAddon>,
}

#[derive(Debug, Deserialize)]
struct Cart {
    order_type: OrderType,
    lines: Vec<CartLine>,
    #[serde(default)]
    delivery_fee: Decimal,
    #[serde(default)]
    discount: Decimal,
}

#[derive(Debug, Serialize)]
struct CartSummary {
    lines: Vec<PricedLine>,
    #[serde(flatten)]
    totals: OrderTotals,
}

fn parse_decimal(value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid amount '{}': {}", value, e))
}

fn parse_order_type(value: &str) -> Result<OrderType, String> {
    OrderType::from_str(value).map_err(String::from)
}

fn parse_status(value: &str) -> Result<OrderStatus, String> {
    OrderStatus::from_str(value).map_err(String::from)
}

fn cart_summary(cart_json: &str) -> Result<CartSummary, String> {
    let cart: Cart = serde_json::from_str(cart_json).map_err(|e| format!("Invalid cart JSON: {}", e))?;

    let lines = cart
        .lines
        .iter()
        .map(|line| pricing::price_line(line.unit_price, line.quantity, &line.addons))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    let totals = OrderTotals::compute(
        lines.iter().map(|l| l.total),
        cart.order_type,
        cart.delivery_fee,
        cart.discount,
    )
    .map_err(|e| e.to_string())?;

    Ok(CartSummary { lines, totals })
}

fn resolve_addons(groups_json: &str, selections_json: &str) -> Result<Vec<ResolvedAddon>, String> {
    let groups: Vec<AddonGroupWithAddons> =
        serde_json::from_str(groups_json).map_err(|e| format!("Invalid addon groups JSON: {}", e))?;
    let selections: Vec<AddonSelection> =
        serde_json::from_str(selections_json).map_err(|e| format!("Invalid selections JSON: {}", e))?;
    domain::validate_addon_selection(&groups, &selections).map_err(|e| e.to_string())
}

fn check_status_change(order_type: &str, from: &str, to: &str) -> Result<(), String> {
    domain::validate_transition(parse_order_type(order_type)?, parse_status(from)?, parse_status(to)?)
        .map_err(|e| e.to_string())
}

fn format_amount(amount: &str, currency: &str) -> Result<String, String> {
    let currency = Currency::from_str(currency).map_err(String::from)?;
    Ok(currency.format(parse_decimal(amount)?))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

fn js_error(message: String) -> JsValue {
    JsValue::from_str(&message)
}

/// Price a cart: `{order_type, lines: [{unit_price, quantity, addons}], delivery_fee, discount}`.
/// Returns the priced lines and the order totals as JSON.
#[wasm_bindgen]
pub fn compute_cart(cart_json: &str) -> Result<String, JsValue> {
    cart_summary(cart_json).and_then(|s| to_json(&s)).map_err(js_error)
}

/// Price a single line
#[wasm_bindgen]
pub fn price_cart_line(unit_price: &str, quantity: i32, addons_json: &str) -> Result<String, JsValue> {
    let run = || {
        let addons: Vec<ResolvedAddon> =
            serde_json::from_str(addons_json).map_err(|e| format!("Invalid addons JSON: {}", e))?;
        let line = pricing::price_line(parse_decimal(unit_price)?, quantity, &addons).map_err(|e| e.to_string())?;
        to_json(&line)
    };
    run().map_err(js_error)
}

/// Check addon choices against a product's groups. Returns the resolved
/// addons as JSON, or the first rule violated as the error message.
#[wasm_bindgen]
pub fn validate_addons(groups_json: &str, selections_json: &str) -> Result<String, JsValue> {
    resolve_addons(groups_json, selections_json)
        .and_then(|resolved| to_json(&resolved))
        .map_err(js_error)
}

/// Status following `status` in the flow of `order_type`, if any
#[wasm_bindgen]
pub fn next_order_status(order_type: &str, status: &str) -> Option<String> {
    let order_type = parse_order_type(order_type).ok()?;
    let status = parse_status(status).ok()?;
    domain::next_status(order_type, status).map(|s| s.as_str().to_string())
}

#[wasm_bindgen]
pub fn order_status_label(order_type: &str, status: &str) -> Result<String, JsValue> {
    let label = parse_order_type(order_type)
        .and_then(|t| parse_status(status).map(|s| domain::status_label(t, s)))
        .map_err(js_error)?;
    Ok(label.to_string())
}

/// Statuses of the flow of `order_type`, in order
#[wasm_bindgen]
pub fn order_status_flow(order_type: &str) -> Result<js_sys::Array, JsValue> {
    let order_type = parse_order_type(order_type).map_err(js_error)?;
    Ok(domain::status_flow(order_type)
        .iter()
        .map(|s| JsValue::from_str(s.as_str()))
        .collect())
}

#[wasm_bindgen]
pub fn validate_status_change(order_type: &str, from: &str, to: &str) -> Result<(), JsValue> {
    check_status_change(order_type, from, to).map_err(js_error)
}

/// Format an amount such as `"1234.5"` in `BRL`, `USD` or `EUR`
#[wasm_bindgen]
pub fn format_price(amount: &str, currency: &str) -> Result<String, JsValue> {
    format_amount(amount, currency).map_err(js_error)
}

/// Change to give back for a cash payment
#[wasm_bindgen]
pub fn cash_change(total: &str, tendered: &str) -> Result<String, JsValue> {
    let run = || {
        let change = pricing::change_due(parse_decimal(total)?, parse_decimal(tendered)?)
            .map_err(|e| e.to_string())?;
        Ok::<_, String>(change.to_string())
    };
    run().map_err(js_error)
}

/// Digits-only form of a phone number
#[wasm_bindgen]
pub fn normalize_phone_number(phone: &str) -> String {
    domain::normalize_phone(phone)
}

#[wasm_bindgen]
pub fn is_valid_phone(phone: &str) -> bool {
    shared::validation::validate_phone(phone).is_ok()
}

#[wasm_bindgen]
pub fn is_valid_email(email: &str) -> bool {
    shared::validation::validate_email(email).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_cart_summary() {
        let cart = r#"{
            "order_type": "delivery",
            "lines": [
                {"unit_price": "25.90", "quantity": 2, "addons": [
                    {"addon_id": "00000000-0000-0000-0000-000000000001",
                     "group_id": "00000000-0000-0000-0000-000000000002",
                     "name": "Bacon", "unit_price": "4.00", "quantity": 1}
                ]},
                {"unit_price": "8.00", "quantity": 1}
            ],
            "delivery_fee": "6.00",
            "discount": "2.00"
        }"#;

        let summary = cart_summary(cart).unwrap();
        assert_eq!(summary.lines[0].total, dec("59.80"));
        assert_eq!(summary.totals.subtotal, dec("67.80"));
        assert_eq!(summary.totals.total, dec("71.80"));
    }

    #[test]
    fn test_cart_rejects_bad_quantity() {
        let cart = r#"{"order_type": "counter", "lines": [{"unit_price": "5", "quantity": 0}]}"#;
        assert!(cart_summary(cart).is_err());
        assert!(cart_summary("not json").is_err());
    }

    #[test]
    fn test_resolve_addons_requires_choice() {
        let groups = r#"[{
            "id": "00000000-0000-0000-0000-0000000000a1",
            "establishment_id": "00000000-0000-0000-0000-000000000000",
            "name": "Size",
            "min_selections": 1,
            "max_selections": 1,
            "allow_repeat": false,
            "is_active": true,
            "position": 0,
            "created_at": "2024-03-01T12:00:00Z",
            "addons": [{
                "id": "00000000-0000-0000-0000-0000000000b1",
                "group_id": "00000000-0000-0000-0000-0000000000a1",
                "establishment_id": "00000000-0000-0000-0000-000000000000",
                "name": "Large",
                "price": "3.00",
                "is_available": true,
                "position": 0
            }]
        }]"#;

        assert!(resolve_addons(groups, "[]").is_err());
        let resolved = resolve_addons(
            groups,
            r#"[{"addon_id": "00000000-0000-0000-0000-0000000000b1"}]"#,
        )
        .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].quantity, 1);
    }

    #[test]
    fn test_next_order_status() {
        assert_eq!(next_order_status("delivery", "ready").as_deref(), Some("out_for_delivery"));
        assert_eq!(next_order_status("table", "served"), None);
        assert_eq!(next_order_status("boat", "pending"), None);
    }

    #[test]
    fn test_status_change_and_format() {
        assert!(check_status_change("counter", "pending", "ready").is_ok());
        assert!(check_status_change("counter", "ready", "pending").is_err());
        assert_eq!(format_amount("1234.5", "BRL").unwrap(), "R$ 1.234,50");
        assert!(format_amount("abc", "BRL").is_err());
    }

    #[test]
    fn test_phone_helpers() {
        assert_eq!(normalize_phone_number("(11) 98765-4321"), "11987654321");
        assert!(is_valid_phone("(11) 98765-4321"));
        assert!(!is_valid_phone("123"));
        assert!(is_valid_email("a@b.com"));
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn compute_cart_returns_json() {
        let cart = r#"{"order_type": "counter", "lines": [{"unit_price": "10.00", "quantity": 3}]}"#;
        let json = compute_cart(cart).unwrap();
        assert!(json.contains("\"total\":\"30.00\""));
    }

    #[wasm_bindgen_test]
    fn errors_cross_as_js_strings() {
        let err = format_price("abc", "BRL").unwrap_err();
        assert!(err.as_string().is_some());
        assert_eq!(format_price("0.01", "EUR").unwrap(), "€ 0,01");
    }
}
