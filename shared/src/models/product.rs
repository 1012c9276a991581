//! Product stock rules
//!
//! `Product.stock` is the authoritative total. Warehouse rows and in-flight
//! transfers attribute part of it to locations; whatever is left is the
//! unassigned quantity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Quantity counted in the product total but not attributed to any warehouse.
///
/// `assigned_total` is the sum of warehouse rows plus quantities sitting in
/// pending or in-transit transfers.
pub fn unassigned_quantity(product_stock: i64, assigned_total: i64) -> i64 {
    product_stock - assigned_total
}

/// Low-stock alert rule
pub fn is_low_stock(stock: i32, min_stock: i32) -> bool {
    stock <= min_stock
}

/// How stock placed into a warehouse relates to the product total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockAssignment {
    /// Goods entering the system: warehouse and product total both grow
    NewStock,
    /// Goods already counted in the total: only the warehouse grows
    FromUnassigned,
}

impl StockAssignment {
    pub fn from_flag(is_new_stock: bool) -> Self {
        if is_new_stock {
            StockAssignment::NewStock
        } else {
            StockAssignment::FromUnassigned
        }
    }

    pub fn touches_product_total(&self) -> bool {
        matches!(self, StockAssignment::NewStock)
    }

    pub fn movement_reason(&self) -> &'static str {
        match self {
            StockAssignment::NewStock => "New stock received",
            StockAssignment::FromUnassigned => "Assigned from unassigned stock",
        }
    }

    /// Check the assignment against the current unassigned quantity
    pub fn check(&self, quantity: i32, unassigned: i64) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::invalid_argument(
                "quantity",
                "Quantity must be greater than zero",
            ));
        }
        if let StockAssignment::FromUnassigned = self {
            if i64::from(quantity) > unassigned {
                return Err(DomainError::InsufficientStock {
                    requested: i64::from(quantity),
                    available: unassigned.max(0),
                });
            }
        }
        Ok(())
    }
}

/// Validate the initial-stock part of a product creation request
///
/// Without a warehouse the quantity stays in the unassigned pool.
pub fn validate_initial_stock(initial_stock: i32) -> DomainResult<()> {
    if initial_stock < 0 {
        return Err(DomainError::invalid_argument(
            "initial_stock",
            "Initial stock cannot be negative",
        ));
    }
    Ok(())
}
