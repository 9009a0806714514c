//! Order handlers: listing, creation, status, payment and item editing

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use shared::models::{Order, OrderWithItems};
use shared::types::{PaginatedResponse, Pagination};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_permission, AuthUser};
use crate::services::order::{
    CreateOrderInput, OrderFilter, OrderItemInput, UpdateItemInput, UpdateOrderDetailsInput,
    UpdatePaymentInput, UpdateStatusInput,
};
use crate::services::{OrderService, SubscriptionService};
use crate::AppState;

fn service(state: &AppState) -> OrderService {
    OrderService::new(state.db.clone(), state.realtime.clone())
}

pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<OrderFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<Order>>> {
    require_permission(&user, "orders", "read")?;
    Ok(Json(
        service(&state)
            .list_orders(user.establishment_id, &filter, &pagination)
            .await?,
    ))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderWithItems>> {
    require_permission(&user, "orders", "read")?;
    Ok(Json(service(&state).get_order(user.establishment_id, order_id).await?))
}

pub async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<OrderWithItems>)> {
    require_permission(&user, "orders", "write")?;
    SubscriptionService::new(state.db.clone())
        .ensure_usable(user.establishment_id)
        .await?;
    let order = service(&state).create_order(user.establishment_id, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateStatusInput>,
) -> AppResult<Json<Order>> {
    require_permission(&user, "orders", "status")?;
    Ok(Json(
        service(&state)
            .update_status(user.establishment_id, order_id, input)
            .await?,
    ))
}

pub async fn update_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdatePaymentInput>,
) -> AppResult<Json<Order>> {
    require_permission(&user, "orders", "payment")?;
    Ok(Json(
        service(&state)
            .update_payment(user.establishment_id, order_id, user.user_id, input)
            .await?,
    ))
}

pub async fn update_details(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateOrderDetailsInput>,
) -> AppResult<Json<Order>> {
    require_permission(&user, "orders", "write")?;
    Ok(Json(
        service(&state)
            .update_details(user.establishment_id, order_id, input)
            .await?,
    ))
}

pub async fn add_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<OrderItemInput>,
) -> AppResult<Json<OrderWithItems>> {
    require_permission(&user, "orders", "write")?;
    Ok(Json(
        service(&state)
            .add_item(user.establishment_id, order_id, input)
            .await?,
    ))
}

pub async fn update_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateItemInput>,
) -> AppResult<Json<OrderWithItems>> {
    require_permission(&user, "orders", "write")?;
    Ok(Json(
        service(&state)
            .update_item(user.establishment_id, order_id, item_id, input)
            .await?,
    ))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<OrderWithItems>> {
    require_permission(&user, "orders", "write")?;
    Ok(Json(
        service(&state)
            .remove_item(user.establishment_id, order_id, item_id)
            .await?,
    ))
}
