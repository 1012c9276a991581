//! Error handling for the Stock Ledger
//!
//! Every workflow error is terminal for the request that triggered it; the
//! transaction it ran in is rolled back when the error propagates.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Caller errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid argument {field}: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Ledger rule violations
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Over receipt: {0}")]
    OverReceipt(String),

    #[error("Cannot cancel partially received order: {0}")]
    CannotCancelPartiallyReceived(String),

    #[error("Conflicting delete of {resource}: {message}")]
    ConflictingDelete { resource: String, message: String },

    // Infrastructure errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_argument(field: &str, message: impl Into<String>) -> Self {
        AppError::InvalidArgument {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn conflicting_delete(resource: &str, message: impl Into<String>) -> Self {
        AppError::ConflictingDelete {
            resource: resource.to_string(),
            message: message.into(),
        }
    }

    /// Map a unique-key violation to `DuplicateEntry`, anything else to `DatabaseError`
    pub fn from_unique_violation(err: sqlx::Error, field: &str) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return AppError::DuplicateEntry(field.to_string());
            }
        }
        AppError::DatabaseError(err)
    }

    /// Map a foreign-key violation raised by a delete to `ConflictingDelete`
    pub fn from_delete_violation(err: sqlx::Error, resource: &str) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_foreign_key_violation() {
                return AppError::conflicting_delete(
                    resource,
                    format!("{} is still referenced by other records", resource),
                );
            }
        }
        AppError::DatabaseError(err)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidArgument { .. } | AppError::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateEntry(_)
            | AppError::ConflictingDelete { .. }
            | AppError::CannotCancelPartiallyReceived(_) => StatusCode::CONFLICT,
            AppError::InvalidStateTransition(_)
            | AppError::InsufficientStock(_)
            | AppError::OverReceipt(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InvalidArgument { .. } | AppError::ValidationError(_) => "INVALID_ARGUMENT",
            AppError::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            AppError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            AppError::OverReceipt(_) => "OVER_RECEIPT",
            AppError::CannotCancelPartiallyReceived(_) => "CANNOT_CANCEL_PARTIALLY_RECEIVED",
            AppError::ConflictingDelete { .. } => "CONFLICTING_DELETE",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Internal(_) | AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();
        match err {
            DomainError::InvalidArgument { field, message } => {
                AppError::InvalidArgument { field, message }
            }
            DomainError::InvalidStateTransition { .. } => AppError::InvalidStateTransition(message),
            DomainError::InsufficientStock { .. } => AppError::InsufficientStock(message),
            DomainError::OverReceipt { .. } => AppError::OverReceipt(message),
            DomainError::PartiallyReceived { .. } => AppError::CannotCancelPartiallyReceived(message),
            DomainError::UnknownLine { item } => AppError::NotFound(format!("Item {}", item)),
            // Only reachable when a stored status is not one we wrote
            DomainError::UnknownValue { .. } => AppError::Internal(message),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect();
        AppError::ValidationError(fields.join("; "))
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

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::InternalError(_) => "An internal server error occurred".to_string(),
            AppError::InvalidArgument { message, .. } => message.clone(),
            AppError::ConflictingDelete { message, .. } => message.clone(),
            other => other.to_string(),
        };

        let field = match &self {
            AppError::InvalidArgument { field, .. } => Some(field.clone()),
            AppError::ConflictingDelete { resource, .. } => Some(resource.clone()),
            AppError::DuplicateEntry(field) => Some(field.clone()),
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_keep_their_kind() {
        let err: AppError = DomainError::InsufficientStock {
            requested: 60,
            available: 30,
        }
        .into();
        assert!(matches!(err, AppError::InsufficientStock(_)));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let err: AppError = DomainError::PartiallyReceived {
            order: "PO-2024-000001".into(),
        }
        .into();
        assert_eq!(err.code(), "CANNOT_CANCEL_PARTIALLY_RECEIVED");

        let err: AppError = DomainError::UnknownLine {
            item: uuid::Uuid::nil(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_argument_keeps_field() {
        let err: AppError = DomainError::invalid_argument("quantity", "must be positive").into();
        match err {
            AppError::InvalidArgument { field, message } => {
                assert_eq!(field, "quantity");
                assert_eq!(message, "must be positive");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_conflict_statuses() {
        assert_eq!(
            AppError::conflicting_delete("warehouse", "holds stock").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::DuplicateEntry("sku".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_infrastructure_errors_are_internal() {
        let errors = [
            AppError::DatabaseError(sqlx::Error::PoolTimedOut),
            AppError::Internal("unexpected status".into()),
            AppError::InternalError(anyhow::anyhow!("boom")),
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::PoolTimedOut).code(),
            "DATABASE_ERROR"
        );
    }
}
