//! Table and tab handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use shared::models::{DiningTable, TabSummary};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_permission, AuthUser};
use crate::services::table::{
    CloseTableInput, ClosedTab, CreateTableInput, TransferTabInput, UpdateTableInput,
};
use crate::services::TableService;
use crate::AppState;

fn service(state: &AppState) -> TableService {
    TableService::new(state.db.clone(), state.realtime.clone())
}

pub async fn list_tables(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<DiningTable>>> {
    require_permission(&user, "tables", "read")?;
    Ok(Json(service(&state).list_tables(user.establishment_id).await?))
}

pub async fn get_table(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(table_id): Path<Uuid>,
) -> AppResult<Json<DiningTable>> {
    require_permission(&user, "tables", "read")?;
    Ok(Json(service(&state).get_table(user.establishment_id, table_id).await?))
}

pub async fn create_table(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateTableInput>,
) -> AppResult<(StatusCode, Json<DiningTable>)> {
    require_permission(&user, "tables", "write")?;
    let table = service(&state).create_table(user.establishment_id, input).await?;
    Ok((StatusCode::CREATED, Json(table)))
}

pub async fn update_table(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(table_id): Path<Uuid>,
    Json(input): Json<UpdateTableInput>,
) -> AppResult<Json<DiningTable>> {
    require_permission(&user, "tables", "write")?;
    Ok(Json(
        service(&state)
            .update_table(user.establishment_id, table_id, input)
            .await?,
    ))
}

pub async fn delete_table(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(table_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_permission(&user, "tables", "write")?;
    service(&state).delete_table(user.establishment_id, table_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Open tab of a table
pub async fn get_tab(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(table_id): Path<Uuid>,
) -> AppResult<Json<TabSummary>> {
    require_permission(&user, "tables", "read")?;
    Ok(Json(service(&state).get_tab(user.establishment_id, table_id).await?))
}

/// Settle the open tab and free the table
pub async fn close_table(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(table_id): Path<Uuid>,
    Json(input): Json<CloseTableInput>,
) -> AppResult<Json<ClosedTab>> {
    require_permission(&user, "orders", "payment")?;
    Ok(Json(
        service(&state)
            .close_table(user.establishment_id, table_id, user.user_id, input)
            .await?,
    ))
}

pub async fn transfer_tab(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(table_id): Path<Uuid>,
    Json(input): Json<TransferTabInput>,
) -> AppResult<Json<TabSummary>> {
    require_permission(&user, "tables", "write")?;
    Ok(Json(
        service(&state)
            .transfer_tab(user.establishment_id, table_id, input)
            .await?,
    ))
}
