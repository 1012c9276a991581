//! Domain rule violations
//!
//! These are raised by the pure rules in this crate. The backend converts them
//! into its HTTP-facing error type.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid argument {field}: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("Cannot {action} {entity} in status {status}")]
    InvalidStateTransition {
        entity: &'static str,
        status: String,
        action: &'static str,
    },

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("Receipt of {requested} exceeds remaining {remaining} on item {item}")]
    OverReceipt {
        item: uuid::Uuid,
        requested: i32,
        remaining: i32,
    },

    #[error("Order {order} has received items and cannot be cancelled")]
    PartiallyReceived { order: String },

    #[error("Item {item} does not belong to this document")]
    UnknownLine { item: uuid::Uuid },

    #[error("Unknown {kind} value: {value}")]
    UnknownValue { kind: &'static str, value: String },
}

impl DomainError {
    pub fn invalid_argument(field: &str, message: impl Into<String>) -> Self {
        DomainError::InvalidArgument {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
