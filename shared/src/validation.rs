//! Input validations for the ledger
//!
//! Used by the backend before any transaction is opened, so rejected requests
//! never touch the database.

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

// ============================================================================
// Catalog Validations
// ============================================================================

/// Validate SKU format (1-50 chars of uppercase letters, digits, '-', '_' or '.')
pub fn validate_sku(sku: &str) -> DomainResult<()> {
    if sku.is_empty() || sku.len() > 50 {
        return Err(DomainError::invalid_argument(
            "sku",
            "SKU must be between 1 and 50 characters",
        ));
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
    {
        return Err(DomainError::invalid_argument(
            "sku",
            "SKU may only contain uppercase letters, digits, '-', '_' and '.'",
        ));
    }
    Ok(())
}

/// Validate warehouse code format (2-20 uppercase alphanumeric or '-')
pub fn validate_warehouse_code(code: &str) -> DomainResult<()> {
    if code.len() < 2 || code.len() > 20 {
        return Err(DomainError::invalid_argument(
            "code",
            "Warehouse code must be between 2 and 20 characters",
        ));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(DomainError::invalid_argument(
            "code",
            "Warehouse code must be uppercase alphanumeric",
        ));
    }
    Ok(())
}

/// Normalize a user-entered code: trimmed and upper-cased
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Validate that a unit price is not negative
pub fn validate_price(field: &str, price: Decimal) -> DomainResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(DomainError::invalid_argument(field, "Price cannot be negative"));
    }
    Ok(())
}

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate a strictly positive quantity
pub fn validate_positive_quantity(field: &str, quantity: i32) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::invalid_argument(
            field,
            "Quantity must be greater than zero",
        ));
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> DomainResult<()> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err(DomainError::invalid_argument("contact_email", "Invalid email format"))
    }
}
