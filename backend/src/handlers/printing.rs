//! Receipt and kitchen ticket handlers

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse},
    Extension, Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::external::print_server::{PrintJobAccepted, PrintServerStatus, PrinterInfo};
use crate::middleware::{require_permission, AuthUser};
use crate::services::printing::{BridgeLink, PrintOptions, PrintRequest};
use crate::services::PrintingService;
use crate::AppState;

fn service(state: &AppState) -> PrintingService {
    PrintingService::new(
        state.db.clone(),
        state.print_client.clone(),
        state.config.printing.clone(),
    )
}

/// Printable HTML receipt, sized for the requested paper
pub async fn receipt_html(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Query(options): Query<PrintOptions>,
) -> AppResult<Html<String>> {
    require_permission(&user, "printing", "use")?;
    let html = service(&state)
        .receipt_html(user.establishment_id, order_id, &options)
        .await?;
    Ok(Html(html))
}

pub async fn kitchen_ticket_html(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Query(options): Query<PrintOptions>,
) -> AppResult<Html<String>> {
    require_permission(&user, "printing", "use")?;
    let html = service(&state)
        .kitchen_ticket_html(user.establishment_id, order_id, &options)
        .await?;
    Ok(Html(html))
}

/// Plain-text receipt for thermal printers
pub async fn receipt_text(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_permission(&user, "printing", "use")?;
    let text = service(&state)
        .receipt_text(user.establishment_id, order_id)
        .await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response())
}

pub async fn bridge_link(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<BridgeLink>> {
    require_permission(&user, "printing", "use")?;
    Ok(Json(
        service(&state)
            .bridge_link(user.establishment_id, order_id)
            .await?,
    ))
}

pub async fn printer_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<PrintServerStatus>> {
    require_permission(&user, "printing", "use")?;
    Ok(Json(service(&state).server_status().await?))
}

pub async fn list_printers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<PrinterInfo>>> {
    require_permission(&user, "printing", "use")?;
    Ok(Json(service(&state).list_printers().await?))
}

/// Send an order ticket to the local print server
pub async fn print_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<PrintRequest>,
) -> AppResult<Json<PrintJobAccepted>> {
    require_permission(&user, "printing", "use")?;
    Ok(Json(
        service(&state)
            .print_order(user.establishment_id, order_id, request)
            .await?,
    ))
}
