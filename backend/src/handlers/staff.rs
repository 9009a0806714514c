//! Staff handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use shared::models::StaffMember;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_permission, AuthUser};
use crate::services::staff::{CreateStaffInput, UpdateStaffInput};
use crate::services::StaffService;
use crate::AppState;

pub async fn list_staff(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<StaffMember>>> {
    require_permission(&user, "staff", "read")?;
    let service = StaffService::new(state.db.clone());
    Ok(Json(service.list_staff(user.establishment_id).await?))
}

pub async fn create_staff(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateStaffInput>,
) -> AppResult<(StatusCode, Json<StaffMember>)> {
    require_permission(&user, "staff", "write")?;
    let service = StaffService::new(state.db.clone());
    let member = service.create_staff(user.establishment_id, input).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn update_staff(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateStaffInput>,
) -> AppResult<Json<StaffMember>> {
    require_permission(&user, "staff", "write")?;
    let service = StaffService::new(state.db.clone());
    Ok(Json(
        service
            .update_staff(user.establishment_id, user.user_id, user_id, input)
            .await?,
    ))
}

pub async fn delete_staff(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_permission(&user, "staff", "delete")?;
    let service = StaffService::new(state.db.clone());
    service
        .delete_staff(user.establishment_id, user.user_id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
