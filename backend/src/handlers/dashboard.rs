//! Dashboard handlers

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::{require_permission, AuthUser};
use crate::services::dashboard::DashboardSummary;
use crate::services::DashboardService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Day to summarize, today when omitted
    pub date: Option<NaiveDate>,
}

pub async fn dashboard_summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<DashboardSummary>> {
    require_permission(&user, "orders", "read")?;
    let service = DashboardService::new(state.db.clone());
    Ok(Json(service.summary(user.establishment_id, query.date).await?))
}
