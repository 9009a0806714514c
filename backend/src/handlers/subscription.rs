//! Subscription handlers

use axum::{extract::State, Extension, Json};
use shared::models::Subscription;

use crate::error::AppResult;
use crate::middleware::{require_permission, AuthUser};
use crate::services::subscription::ChangePlanInput;
use crate::services::SubscriptionService;
use crate::AppState;

pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Subscription>> {
    require_permission(&user, "subscription", "read")?;
    let service = SubscriptionService::new(state.db.clone());
    Ok(Json(service.get(user.establishment_id).await?))
}

pub async fn change_plan(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ChangePlanInput>,
) -> AppResult<Json<Subscription>> {
    require_permission(&user, "subscription", "write")?;
    let service = SubscriptionService::new(state.db.clone());
    Ok(Json(service.change_plan(user.establishment_id, input).await?))
}

pub async fn cancel_subscription(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Subscription>> {
    require_permission(&user, "subscription", "write")?;
    let service = SubscriptionService::new(state.db.clone());
    Ok(Json(service.cancel(user.establishment_id).await?))
}
