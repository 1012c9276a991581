//! Purchase order rules
//!
//! The order status is derived from its lines after every receipt; it is
//! never set independently of them.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Status of a purchase order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Draft,
    Pending,
    Partial,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "DRAFT",
            PurchaseOrderStatus::Pending => "PENDING",
            PurchaseOrderStatus::Partial => "PARTIAL",
            PurchaseOrderStatus::Received => "RECEIVED",
            PurchaseOrderStatus::Cancelled => "CANCELLED",
        }
    }

    fn transition_error(&self, action: &'static str) -> DomainError {
        DomainError::InvalidStateTransition {
            entity: "purchase order",
            status: self.as_str().to_string(),
            action,
        }
    }

    /// DRAFT -> PENDING
    pub fn submit(self) -> DomainResult<PurchaseOrderStatus> {
        match self {
            PurchaseOrderStatus::Draft => Ok(PurchaseOrderStatus::Pending),
            other => Err(other.transition_error("submit")),
        }
    }

    pub fn ensure_can_receive(self) -> DomainResult<()> {
        match self {
            PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled => {
                Err(self.transition_error("receive"))
            }
            _ => Ok(()),
        }
    }

    /// Cancellation is blocked by terminal states and by any received line
    pub fn cancel(self, order_number: &str, lines: &[PurchaseLine]) -> DomainResult<PurchaseOrderStatus> {
        match self {
            PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled => {
                Err(self.transition_error("cancel"))
            }
            _ if lines.iter().any(|l| l.received_qty > 0) => Err(DomainError::PartiallyReceived {
                order: order_number.to_string(),
            }),
            _ => Ok(PurchaseOrderStatus::Cancelled),
        }
    }
}

impl std::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(PurchaseOrderStatus::Draft),
            "PENDING" => Ok(PurchaseOrderStatus::Pending),
            "PARTIAL" => Ok(PurchaseOrderStatus::Partial),
            "RECEIVED" => Ok(PurchaseOrderStatus::Received),
            "CANCELLED" => Ok(PurchaseOrderStatus::Cancelled),
            _ => Err(DomainError::UnknownValue {
                kind: "purchase order status",
                value: s.to_string(),
            }),
        }
    }
}

/// Receiving state of one order line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseLine {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub received_qty: i32,
}

impl PurchaseLine {
    pub fn remaining(&self) -> i32 {
        self.quantity - self.received_qty
    }

    pub fn is_fully_received(&self) -> bool {
        self.received_qty >= self.quantity
    }
}

/// New order line as requested by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Validate the lines of a new purchase order
pub fn validate_order_lines(lines: &[OrderLineInput]) -> DomainResult<()> {
    if lines.is_empty() {
        return Err(DomainError::invalid_argument(
            "items",
            "A purchase order needs at least one item",
        ));
    }
    for (i, line) in lines.iter().enumerate() {
        crate::validation::validate_positive_quantity(&format!("items[{}].quantity", i), line.quantity)?;
        crate::validation::validate_price(&format!("items[{}].unit_price", i), line.unit_price)?;
    }
    Ok(())
}

/// Order total: sum of quantity x unit price
pub fn calculate_order_total(lines: &[OrderLineInput]) -> Decimal {
    lines
        .iter()
        .map(|l| Decimal::from(l.quantity) * l.unit_price)
        .sum()
}

/// Status after a receipt, as a pure function of the lines
pub fn derive_order_status(current: PurchaseOrderStatus, lines: &[PurchaseLine]) -> PurchaseOrderStatus {
    if !lines.is_empty() && lines.iter().all(PurchaseLine::is_fully_received) {
        PurchaseOrderStatus::Received
    } else if lines.iter().any(|l| l.received_qty > 0) {
        PurchaseOrderStatus::Partial
    } else {
        current
    }
}

/// One requested receipt entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReceiptEntry {
    pub item_id: Uuid,
    pub quantity: i32,
}

/// Validated receipt of one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReceipt {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Check a whole receipt against the lines before anything is written
///
/// Entries for the same item are summed and zero entries are ignored. The
/// result is ordered by product id so row locks are always taken in the same
/// order.
pub fn plan_receipt(lines: &[PurchaseLine], entries: &[ReceiptEntry]) -> DomainResult<Vec<PlannedReceipt>> {
    let mut requested: BTreeMap<Uuid, i64> = BTreeMap::new();
    for (i, entry) in entries.iter().enumerate() {
        if entry.quantity < 0 {
            return Err(DomainError::invalid_argument(
                &format!("items[{}].quantity", i),
                "Received quantity cannot be negative",
            ));
        }
        if entry.quantity == 0 {
            continue;
        }
        *requested.entry(entry.item_id).or_insert(0) += i64::from(entry.quantity);
    }

    if requested.is_empty() {
        return Err(DomainError::invalid_argument("items", "Nothing to receive"));
    }

    let mut plan = Vec::with_capacity(requested.len());
    for (item_id, quantity) in requested {
        let line = lines
            .iter()
            .find(|l| l.item_id == item_id)
            .ok_or(DomainError::UnknownLine { item: item_id })?;

        if quantity > i64::from(line.remaining()) {
            return Err(DomainError::OverReceipt {
                item: item_id,
                requested: i32::try_from(quantity).unwrap_or(i32::MAX),
                remaining: line.remaining(),
            });
        }

        plan.push(PlannedReceipt {
            item_id,
            product_id: line.product_id,
            // Bounded by `remaining` above
            quantity: quantity as i32,
        });
    }

    plan.sort_by_key(|p| (p.product_id, p.item_id));
    Ok(plan)
}

/// Lines as they will look after `plan` is applied
pub fn apply_receipt(lines: &[PurchaseLine], plan: &[PlannedReceipt]) -> Vec<PurchaseLine> {
    lines
        .iter()
        .map(|line| {
            let added: i32 = plan
                .iter()
                .filter(|p| p.item_id == line.item_id)
                .map(|p| p.quantity)
                .sum();
            PurchaseLine {
                received_qty: line.received_qty + added,
                ..line.clone()
            }
        })
        .collect()
}
