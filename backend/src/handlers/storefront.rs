//! Public storefront handlers (no authentication)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::AppResult;
use crate::services::checkout::{PlaceOrderInput, PlacedOrder, Storefront, TrackedOrder};
use crate::services::CheckoutService;
use crate::AppState;

fn service(state: &AppState) -> CheckoutService {
    CheckoutService::new(
        state.db.clone(),
        state.realtime.clone(),
        state.config.storefront.clone(),
    )
}

/// Store profile and menu
pub async fn get_storefront(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Storefront>> {
    Ok(Json(service(&state).storefront(&slug).await?))
}

pub async fn place_order(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(input): Json<PlaceOrderInput>,
) -> AppResult<(StatusCode, Json<PlacedOrder>)> {
    let placed = service(&state).place_order(&slug, input).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

/// Order status for the tracking page
pub async fn track_order(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<TrackedOrder>> {
    Ok(Json(service(&state).track(&token).await?))
}
