//! Authentication handlers

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::services::auth::{AuthTokens, Me, RegisterEstablishmentInput, RegisterResponse};
use crate::services::AuthService;
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthTokens>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.login(&body.email, &body.password).await?;
    Ok(Json(tokens))
}

/// Register establishment endpoint handler
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterEstablishmentInput>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let result = auth_service.register_establishment(body).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Refresh token endpoint handler
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<AuthTokens>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.refresh_token(&body.refresh_token).await?;
    Ok(Json(tokens))
}

/// Current user, establishment and permissions
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Me>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let me = auth_service.me(user.user_id, user.establishment_id).await?;
    Ok(Json(me))
}
