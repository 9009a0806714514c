//! Financial transaction handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use shared::models::{FinanceSummary, FinancialTransaction};
use shared::types::DateRange;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_permission, AuthUser};
use crate::services::finance::{CreateTransactionInput, TransactionFilter};
use crate::services::FinanceService;
use crate::AppState;

fn service(state: &AppState) -> FinanceService {
    FinanceService::new(state.db.clone(), state.realtime.clone())
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<TransactionFilter>,
) -> AppResult<Json<Vec<FinancialTransaction>>> {
    require_permission(&user, "finance", "read")?;
    Ok(Json(
        service(&state)
            .list_transactions(user.establishment_id, &filter)
            .await?,
    ))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateTransactionInput>,
) -> AppResult<(StatusCode, Json<FinancialTransaction>)> {
    require_permission(&user, "finance", "write")?;
    let transaction = service(&state)
        .create_transaction(user.establishment_id, user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_permission(&user, "finance", "write")?;
    service(&state)
        .delete_transaction(user.establishment_id, transaction_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn finance_summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(range): Query<DateRange>,
) -> AppResult<Json<FinanceSummary>> {
    require_permission(&user, "finance", "read")?;
    Ok(Json(service(&state).summary(user.establishment_id, &range).await?))
}

/// Download transactions as CSV
pub async fn export_csv(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<TransactionFilter>,
) -> AppResult<impl IntoResponse> {
    require_permission(&user, "finance", "read")?;
    let csv = service(&state).export_csv(user.establishment_id, &filter).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"transactions.csv\""),
        ],
        csv,
    )
        .into_response())
}
