//! Customer handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use shared::models::{Customer, CustomerStats};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_permission, AuthUser};
use crate::services::customer::{CustomerInput, UpdateCustomerInput};
use crate::services::CustomerService;
use crate::AppState;

#[derive(Deserialize)]
pub struct CustomerQuery {
    /// Name or phone fragment
    pub q: Option<String>,
}

fn service(state: &AppState) -> CustomerService {
    CustomerService::new(state.db.clone(), state.realtime.clone())
}

pub async fn list_customers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<CustomerQuery>,
) -> AppResult<Json<Vec<Customer>>> {
    require_permission(&user, "customers", "read")?;
    Ok(Json(
        service(&state)
            .list_customers(user.establishment_id, query.q.as_deref())
            .await?,
    ))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<Customer>> {
    require_permission(&user, "customers", "read")?;
    Ok(Json(service(&state).get_customer(user.establishment_id, customer_id).await?))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CustomerInput>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    require_permission(&user, "customers", "write")?;
    let customer = service(&state).create_customer(user.establishment_id, input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<UpdateCustomerInput>,
) -> AppResult<Json<Customer>> {
    require_permission(&user, "customers", "write")?;
    Ok(Json(
        service(&state)
            .update_customer(user.establishment_id, customer_id, input)
            .await?,
    ))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_permission(&user, "customers", "write")?;
    service(&state).delete_customer(user.establishment_id, customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn customer_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<CustomerStats>> {
    require_permission(&user, "customers", "read")?;
    Ok(Json(
        service(&state)
            .customer_stats(user.establishment_id, customer_id)
            .await?,
    ))
}

/// Find a customer by phone or create one, as the storefront does
pub async fn upsert_customer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CustomerInput>,
) -> AppResult<Json<Customer>> {
    require_permission(&user, "customers", "write")?;
    Ok(Json(
        service(&state)
            .upsert_by_phone(user.establishment_id, input)
            .await?,
    ))
}
