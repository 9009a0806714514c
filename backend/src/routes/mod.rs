//! Route definitions for the Delivery Hub API

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Public storefront and order tracking
        .nest("/store", storefront_routes())
        .route("/track/:token", get(handlers::track_order))
        // Protected routes
        .nest("/establishment", establishment_routes())
        .nest("/categories", category_routes())
        .nest("/products", product_routes())
        .nest("/addon-groups", addon_group_routes())
        .nest("/addons", addon_routes())
        .nest("/orders", order_routes())
        .nest("/tables", table_routes())
        .nest("/customers", customer_routes())
        .nest("/finance", finance_routes())
        .nest("/staff", staff_routes())
        .nest("/subscription", subscription_routes())
        .nest("/dashboard", dashboard_routes())
        .nest("/realtime", realtime_routes())
        .nest("/printing", printing_routes())
}

/// Authentication routes
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .merge(
            Router::new()
                .route("/me", get(handlers::me))
                .route_layer(middleware::from_fn(auth_middleware)),
        )
}

/// Public storefront routes (no authentication)
fn storefront_routes() -> Router<AppState> {
    Router::new()
        .route("/:slug", get(handlers::get_storefront))
        .route("/:slug/orders", post(handlers::place_order))
}

fn establishment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::get_establishment).put(handlers::update_settings),
        )
        .route("/open", put(handlers::set_open))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Category routes (protected)
fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/reorder", put(handlers::reorder_categories))
        .route("/seed-defaults", post(handlers::seed_default_categories))
        .route(
            "/:category_id",
            put(handlers::update_category).delete(handlers::delete_category),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Product routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/:product_id/availability",
            patch(handlers::set_product_availability),
        )
        .route(
            "/:product_id/addon-groups",
            get(handlers::list_product_addon_groups).post(handlers::link_addon_group),
        )
        .route(
            "/:product_id/addon-groups/:group_id",
            delete(handlers::unlink_addon_group),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Addon group routes (protected)
fn addon_group_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_groups).post(handlers::create_group))
        .route(
            "/:group_id",
            put(handlers::update_group).delete(handlers::delete_group),
        )
        .route("/:group_id/addons", post(handlers::create_addon))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Addon routes (protected)
fn addon_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:addon_id",
            put(handlers::update_addon).delete(handlers::delete_addon),
        )
        .route(
            "/:addon_id/availability",
            patch(handlers::set_addon_availability),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Order routes (protected)
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route(
            "/:order_id",
            get(handlers::get_order).put(handlers::update_details),
        )
        .route("/:order_id/status", put(handlers::update_status))
        .route("/:order_id/payment", put(handlers::update_payment))
        .route("/:order_id/items", post(handlers::add_item))
        .route(
            "/:order_id/items/:item_id",
            put(handlers::update_item).delete(handlers::remove_item),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Table and tab routes (protected)
fn table_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_tables).post(handlers::create_table))
        .route(
            "/:table_id",
            get(handlers::get_table)
                .put(handlers::update_table)
                .delete(handlers::delete_table),
        )
        .route("/:table_id/tab", get(handlers::get_tab))
        .route("/:table_id/close", post(handlers::close_table))
        .route("/:table_id/transfer", post(handlers::transfer_tab))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Customer routes (protected)
fn customer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_customers).post(handlers::create_customer),
        )
        .route("/upsert", post(handlers::upsert_customer))
        .route(
            "/:customer_id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
        .route("/:customer_id/stats", get(handlers::customer_stats))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Finance routes (protected)
fn finance_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route(
            "/transactions/:transaction_id",
            delete(handlers::delete_transaction),
        )
        .route("/summary", get(handlers::finance_summary))
        .route("/export", get(handlers::export_csv))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Staff routes (protected)
fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_staff).post(handlers::create_staff))
        .route(
            "/:user_id",
            put(handlers::update_staff).delete(handlers::delete_staff),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_subscription))
        .route("/plan", put(handlers::change_plan))
        .route("/cancel", post(handlers::cancel_subscription))
        .route_layer(middleware::from_fn(auth_middleware))
}

fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(handlers::dashboard_summary))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Server-sent change events (protected, token may come as a query parameter)
fn realtime_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(handlers::stream_changes))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Printing routes (protected)
fn printing_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(handlers::printer_status))
        .route("/printers", get(handlers::list_printers))
        .route("/orders/:order_id/receipt", get(handlers::receipt_html))
        .route("/orders/:order_id/kitchen", get(handlers::kitchen_ticket_html))
        .route("/orders/:order_id/receipt.txt", get(handlers::receipt_text))
        .route("/orders/:order_id/bridge-link", get(handlers::bridge_link))
        .route("/orders/:order_id/print", post(handlers::print_order))
        .route_layer(middleware::from_fn(auth_middleware))
}
