//! Establishment settings handlers

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use shared::models::{Establishment, EstablishmentSettings};

use crate::error::AppResult;
use crate::middleware::{require_permission, AuthUser};
use crate::services::EstablishmentService;
use crate::AppState;

#[derive(Deserialize)]
pub struct SetOpenRequest {
    pub is_open: bool,
}

pub async fn get_establishment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Establishment>> {
    require_permission(&user, "establishment", "read")?;
    let service = EstablishmentService::new(state.db.clone(), state.realtime.clone());
    Ok(Json(service.get(user.establishment_id).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(settings): Json<EstablishmentSettings>,
) -> AppResult<Json<Establishment>> {
    require_permission(&user, "establishment", "write")?;
    let service = EstablishmentService::new(state.db.clone(), state.realtime.clone());
    Ok(Json(service.update_settings(user.establishment_id, settings).await?))
}

/// Open or close the storefront
pub async fn set_open(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SetOpenRequest>,
) -> AppResult<Json<Establishment>> {
    require_permission(&user, "establishment", "write")?;
    let service = EstablishmentService::new(state.db.clone(), state.realtime.clone());
    Ok(Json(service.set_open(user.establishment_id, body.is_open).await?))
}
