//! Error handling for the Delivery Hub server
//!
//! Every failure reaching a handler becomes a JSON body of the form
//! `{"error": {"code", "message", "field"?}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::models::{AddonSelectionError, OrderFlowError};
use shared::pricing::PricingError;
use thiserror::Error;

/// Postgres SQLSTATE for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Invalid addon selection: {0}")]
    InvalidAddonSelection(#[from] AddonSelectionError),

    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("Plan limit reached: {0}")]
    PlanLimitReached(String),

    #[error("Subscription inactive")]
    SubscriptionInactive,

    #[error("Store closed")]
    StoreClosed,

    // External service errors
    #[error("Print server error: {0}")]
    PrintServer(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or("record").to_string();
                return AppError::DuplicateEntry(constraint);
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<OrderFlowError> for AppError {
    fn from(err: OrderFlowError) -> Self {
        match err {
            OrderFlowError::MissingTable | OrderFlowError::UnexpectedTable => AppError::Validation {
                field: "table_id".to_string(),
                message: err.to_string(),
            },
            OrderFlowError::MissingAddress => AppError::Validation {
                field: "delivery_address".to_string(),
                message: err.to_string(),
            },
            other => AppError::InvalidStateTransition(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let first = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                (field.to_string(), message)
            });

        match first {
            Some((field, message)) => AppError::Validation { field, message },
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

impl AppError {
    /// Shorthand for a field validation failure
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    fn is_server_fault(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseError(_) | AppError::Internal(_) | AppError::InternalError(_)
        )
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_CREDENTIALS", "Invalid email or password"),
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("TOKEN_EXPIRED", "Token has expired"),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token"),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                ),
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone()),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field),
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "DUPLICATE_ENTRY",
                    format!("A record with this {} already exists", field),
                )
                .with_field(field),
            ),
            AppError::Conflict { resource, message } => (
                StatusCode::CONFLICT,
                ErrorDetail::new("CONFLICT", message.clone()).with_field(resource),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INVALID_STATE_TRANSITION", msg.clone()),
            ),
            AppError::InvalidAddonSelection(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INVALID_ADDON_SELECTION", err.to_string()).with_field("addons"),
            ),
            AppError::Pricing(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("PRICING_ERROR", err.to_string()),
            ),
            AppError::PlanLimitReached(resource) => (
                StatusCode::PAYMENT_REQUIRED,
                ErrorDetail::new(
                    "PLAN_LIMIT_REACHED",
                    format!("Your plan does not allow more {}", resource),
                ),
            ),
            AppError::SubscriptionInactive => (
                StatusCode::PAYMENT_REQUIRED,
                ErrorDetail::new(
                    "SUBSCRIPTION_INACTIVE",
                    "The subscription of this establishment is not active",
                ),
            ),
            AppError::StoreClosed => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("STORE_CLOSED", "The store is not accepting orders right now"),
            ),
            AppError::PrintServer(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("PRINT_SERVER_ERROR", format!("Print server error: {}", msg)),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        };

        if self.is_server_fault() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Request failed: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::OrderStatus;

    #[test]
    fn test_order_flow_errors_map_to_fields() {
        match AppError::from(OrderFlowError::MissingAddress) {
            AppError::Validation { field, .. } => assert_eq!(field, "delivery_address"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            AppError::from(OrderFlowError::Terminal(OrderStatus::Delivered)),
            AppError::InvalidStateTransition(_)
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("Order".into()).into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::DuplicateEntry("slug".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(PricingError::NegativeDiscount).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::SubscriptionInactive.into_response().status(),
            StatusCode::PAYMENT_REQUIRED
        );
    }
}
