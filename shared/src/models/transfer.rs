//! Warehouse transfer state machine
//!
//! PENDING -> IN_TRANSIT -> COMPLETED, PENDING -> COMPLETED,
//! PENDING | IN_TRANSIT -> CANCELLED. COMPLETED and CANCELLED are terminal.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Status of a warehouse transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Pending,
    InTransit,
    Completed,
    Cancelled,
}

/// Operations that move a transfer between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    MarkInTransit,
    Complete,
    Cancel,
}

impl TransferAction {
    fn verb(&self) -> &'static str {
        match self {
            TransferAction::MarkInTransit => "mark in transit",
            TransferAction::Complete => "complete",
            TransferAction::Cancel => "cancel",
        }
    }
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::InTransit => "IN_TRANSIT",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Cancelled)
    }

    /// Resulting status of `action`, or InvalidStateTransition
    pub fn apply(self, action: TransferAction) -> DomainResult<TransferStatus> {
        use TransferAction::*;
        use TransferStatus::*;

        match (self, action) {
            (Pending, MarkInTransit) => Ok(InTransit),
            (Pending | InTransit, Complete) => Ok(Completed),
            (Pending | InTransit, Cancel) => Ok(Cancelled),
            (status, action) => Err(DomainError::InvalidStateTransition {
                entity: "transfer",
                status: status.as_str().to_string(),
                action: action.verb(),
            }),
        }
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TransferStatus::Pending),
            "IN_TRANSIT" => Ok(TransferStatus::InTransit),
            "COMPLETED" => Ok(TransferStatus::Completed),
            "CANCELLED" => Ok(TransferStatus::Cancelled),
            _ => Err(DomainError::UnknownValue {
                kind: "transfer status",
                value: s.to_string(),
            }),
        }
    }
}

/// Validate a transfer request before any stock is touched
pub fn validate_transfer_request(from: Uuid, to: Uuid, quantity: i32) -> DomainResult<()> {
    if from == to {
        return Err(DomainError::invalid_argument(
            "to_warehouse_id",
            "Source and destination warehouses must differ",
        ));
    }
    if quantity <= 0 {
        return Err(DomainError::invalid_argument(
            "quantity",
            "Quantity must be greater than zero",
        ));
    }
    Ok(())
}
