//! Addon group and addon handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use shared::models::{Addon, AddonGroup, AddonGroupWithAddons};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::catalog::AvailabilityRequest;
use crate::middleware::{require_permission, AuthUser};
use crate::services::addon::{
    CreateAddonGroupInput, CreateAddonInput, UpdateAddonGroupInput, UpdateAddonInput,
};
use crate::services::AddonService;
use crate::AppState;

fn service(state: &AppState) -> AddonService {
    AddonService::new(state.db.clone(), state.realtime.clone())
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<AddonGroupWithAddons>>> {
    require_permission(&user, "catalog", "read")?;
    Ok(Json(service(&state).list_groups(user.establishment_id).await?))
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateAddonGroupInput>,
) -> AppResult<(StatusCode, Json<AddonGroup>)> {
    require_permission(&user, "catalog", "write")?;
    let group = service(&state).create_group(user.establishment_id, input).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn update_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<Uuid>,
    Json(input): Json<UpdateAddonGroupInput>,
) -> AppResult<Json<AddonGroup>> {
    require_permission(&user, "catalog", "write")?;
    Ok(Json(
        service(&state)
            .update_group(user.establishment_id, group_id, input)
            .await?,
    ))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_permission(&user, "catalog", "write")?;
    service(&state).delete_group(user.establishment_id, group_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_addon(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<Uuid>,
    Json(input): Json<CreateAddonInput>,
) -> AppResult<(StatusCode, Json<Addon>)> {
    require_permission(&user, "catalog", "write")?;
    let addon = service(&state)
        .create_addon(user.establishment_id, group_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(addon)))
}

pub async fn update_addon(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(addon_id): Path<Uuid>,
    Json(input): Json<UpdateAddonInput>,
) -> AppResult<Json<Addon>> {
    require_permission(&user, "catalog", "write")?;
    Ok(Json(
        service(&state)
            .update_addon(user.establishment_id, addon_id, input)
            .await?,
    ))
}

pub async fn set_addon_availability(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(addon_id): Path<Uuid>,
    Json(body): Json<AvailabilityRequest>,
) -> AppResult<Json<Addon>> {
    require_permission(&user, "catalog", "write")?;
    Ok(Json(
        service(&state)
            .set_addon_availability(user.establishment_id, addon_id, body.is_available)
            .await?,
    ))
}

pub async fn delete_addon(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(addon_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_permission(&user, "catalog", "write")?;
    service(&state).delete_addon(user.establishment_id, addon_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
