//! Category, product and product addon group handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use shared::models::{AddonGroupWithAddons, Category, Product};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_permission, AuthUser};
use crate::services::catalog::{
    CreateCategoryInput, CreateProductInput, LinkAddonGroupInput, UpdateCategoryInput,
    UpdateProductInput,
};
use crate::services::CatalogService;
use crate::AppState;

#[derive(Deserialize)]
pub struct ProductQuery {
    pub category_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ReorderRequest {
    pub category_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

fn service(state: &AppState) -> CatalogService {
    CatalogService::new(state.db.clone(), state.realtime.clone())
}

// ---- Categories ----

pub async fn list_categories(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Category>>> {
    require_permission(&user, "catalog", "read")?;
    Ok(Json(service(&state).list_categories(user.establishment_id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    require_permission(&user, "catalog", "write")?;
    let category = service(&state).create_category(user.establishment_id, input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(category_id): Path<Uuid>,
    Json(input): Json<UpdateCategoryInput>,
) -> AppResult<Json<Category>> {
    require_permission(&user, "catalog", "write")?;
    Ok(Json(
        service(&state)
            .update_category(user.establishment_id, category_id, input)
            .await?,
    ))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(category_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_permission(&user, "catalog", "write")?;
    service(&state).delete_category(user.establishment_id, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_categories(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ReorderRequest>,
) -> AppResult<Json<Vec<Category>>> {
    require_permission(&user, "catalog", "write")?;
    Ok(Json(
        service(&state)
            .reorder_categories(user.establishment_id, &body.category_ids)
            .await?,
    ))
}

/// Create the default categories that are missing
pub async fn seed_default_categories(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Category>>> {
    require_permission(&user, "catalog", "write")?;
    Ok(Json(service(&state).seed_default_categories(user.establishment_id).await?))
}

// ---- Products ----

pub async fn list_products(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<Vec<Product>>> {
    require_permission(&user, "catalog", "read")?;
    Ok(Json(
        service(&state)
            .list_products(user.establishment_id, query.category_id)
            .await?,
    ))
}

pub async fn get_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    require_permission(&user, "catalog", "read")?;
    Ok(Json(service(&state).get_product(user.establishment_id, product_id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    require_permission(&user, "catalog", "write")?;
    let product = service(&state).create_product(user.establishment_id, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    require_permission(&user, "catalog", "write")?;
    Ok(Json(
        service(&state)
            .update_product(user.establishment_id, product_id, input)
            .await?,
    ))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(product_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_permission(&user, "catalog", "write")?;
    service(&state).delete_product(user.establishment_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_product_availability(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(product_id): Path<Uuid>,
    Json(body): Json<AvailabilityRequest>,
) -> AppResult<Json<Product>> {
    require_permission(&user, "catalog", "write")?;
    Ok(Json(
        service(&state)
            .set_product_availability(user.establishment_id, product_id, body.is_available)
            .await?,
    ))
}

// ---- Product addon groups ----

pub async fn list_product_addon_groups(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<AddonGroupWithAddons>>> {
    require_permission(&user, "catalog", "read")?;
    Ok(Json(
        service(&state)
            .product_addon_groups(user.establishment_id, product_id)
            .await?,
    ))
}

pub async fn link_addon_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<LinkAddonGroupInput>,
) -> AppResult<Json<Vec<AddonGroupWithAddons>>> {
    require_permission(&user, "catalog", "write")?;
    Ok(Json(
        service(&state)
            .link_addon_group(user.establishment_id, product_id, input)
            .await?,
    ))
}

pub async fn unlink_addon_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((product_id, group_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    require_permission(&user, "catalog", "write")?;
    service(&state)
        .unlink_addon_group(user.establishment_id, product_id, group_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
