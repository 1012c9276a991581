//! Transactional stock primitives
//!
//! Every workflow that changes a quantity goes through these helpers, always on
//! the caller's open transaction. Rows are locked before they are checked, and
//! warehouse decrements are conditional updates so the check and the write are
//! one statement.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{apply_delta, unassigned_quantity, DomainError, MovementQuantity};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::movement::StockMovement;
use crate::services::product::Product;
use crate::services::warehouse::Warehouse;

/// Quantity of one product held in one warehouse
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WarehouseStock {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

/// Movement row about to be appended to the log
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub quantity: MovementQuantity,
    pub user_id: Uuid,
    pub reason: Option<String>,
}

pub(crate) const PRODUCT_COLUMNS: &str =
    "id, sku, name, price, unit, min_stock, stock, created_at, updated_at";

pub(crate) const WAREHOUSE_COLUMNS: &str = "id, code, name, is_active, created_at, updated_at";

pub(crate) const MOVEMENT_COLUMNS: &str =
    "id, product_id, warehouse_id, movement_type, quantity, user_id, reason, created_at";

/// Lock a product row for the rest of the transaction
pub async fn lock_product(conn: &mut PgConnection, product_id: Uuid) -> AppResult<Product> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products WHERE id = $1 FOR UPDATE",
        PRODUCT_COLUMNS
    ))
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

pub async fn find_warehouse(conn: &mut PgConnection, warehouse_id: Uuid) -> AppResult<Warehouse> {
    sqlx::query_as::<_, Warehouse>(&format!(
        "SELECT {} FROM warehouses WHERE id = $1",
        WAREHOUSE_COLUMNS
    ))
    .bind(warehouse_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
}

/// Fetch a warehouse and require it to accept new work
pub async fn active_warehouse(conn: &mut PgConnection, warehouse_id: Uuid) -> AppResult<Warehouse> {
    let warehouse = find_warehouse(conn, warehouse_id).await?;

    if !warehouse.is_active {
        return Err(AppError::invalid_argument(
            "warehouse_id",
            format!("Warehouse {} is inactive", warehouse.code),
        ));
    }

    Ok(warehouse)
}

/// Sum of warehouse rows plus in-flight transfers for one product
///
/// One statement, so both halves come from the same snapshot.
pub async fn assigned_total(conn: &mut PgConnection, product_id: Uuid) -> AppResult<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT
            COALESCE((SELECT SUM(quantity) FROM warehouse_stock WHERE product_id = $1), 0)::BIGINT
          + COALESCE((SELECT SUM(quantity) FROM warehouse_transfers
                      WHERE product_id = $1 AND status IN ('PENDING', 'IN_TRANSIT')), 0)::BIGINT
        "#,
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

/// Unassigned quantity of a product whose row the caller already holds
pub async fn unassigned_for(conn: &mut PgConnection, product: &Product) -> AppResult<i64> {
    let assigned = assigned_total(conn, product.id).await?;
    Ok(unassigned_quantity(i64::from(product.stock), assigned))
}

/// Add `quantity` to a warehouse row, creating it on first use
pub async fn credit_warehouse(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<WarehouseStock> {
    let row = sqlx::query_as::<_, WarehouseStock>(
        r#"
        INSERT INTO warehouse_stock (warehouse_id, product_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (warehouse_id, product_id)
        DO UPDATE SET quantity = warehouse_stock.quantity + EXCLUDED.quantity,
                      updated_at = NOW()
        RETURNING id, warehouse_id, product_id, quantity, updated_at
        "#,
    )
    .bind(warehouse_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Take `quantity` out of a warehouse row, failing if it holds less
pub async fn debit_warehouse(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<WarehouseStock> {
    let updated = sqlx::query_as::<_, WarehouseStock>(
        r#"
        UPDATE warehouse_stock
        SET quantity = quantity - $3, updated_at = NOW()
        WHERE warehouse_id = $1 AND product_id = $2 AND quantity >= $3
        RETURNING id, warehouse_id, product_id, quantity, updated_at
        "#,
    )
    .bind(warehouse_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(row) => Ok(row),
        None => {
            let available = sqlx::query_scalar::<_, i32>(
                "SELECT quantity FROM warehouse_stock WHERE warehouse_id = $1 AND product_id = $2",
            )
            .bind(warehouse_id)
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?
            .unwrap_or(0);

            Err(DomainError::InsufficientStock {
                requested: i64::from(quantity),
                available: i64::from(available),
            }
            .into())
        }
    }
}

/// Apply a signed delta to a warehouse row
pub async fn adjust_warehouse(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
    product_id: Uuid,
    delta: i64,
) -> AppResult<Option<WarehouseStock>> {
    let quantity = i32::try_from(delta.unsigned_abs())
        .map_err(|_| AppError::invalid_argument("quantity", "Quantity is out of range"))?;

    match delta.signum() {
        1 => Ok(Some(credit_warehouse(conn, warehouse_id, product_id, quantity).await?)),
        -1 => Ok(Some(debit_warehouse(conn, warehouse_id, product_id, quantity).await?)),
        _ => Ok(None),
    }
}

/// Apply a signed delta to the product total; the row must already be locked
pub async fn adjust_product_stock(
    conn: &mut PgConnection,
    product: &Product,
    delta: i64,
) -> AppResult<i32> {
    let next = apply_delta(i64::from(product.stock), delta)?;
    let next = i32::try_from(next)
        .map_err(|_| AppError::invalid_argument("quantity", "Resulting stock is out of range"))?;

    sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
        .bind(product.id)
        .bind(next)
        .execute(&mut *conn)
        .await?;

    Ok(next)
}

/// Append one movement to the log
pub async fn append_movement(
    conn: &mut PgConnection,
    movement: NewMovement,
) -> AppResult<StockMovement> {
    movement.quantity.validate()?;

    let row = sqlx::query_as::<_, StockMovement>(&format!(
        r#"
        INSERT INTO stock_movements (product_id, warehouse_id, movement_type, quantity, user_id, reason)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        MOVEMENT_COLUMNS
    ))
    .bind(movement.product_id)
    .bind(movement.warehouse_id)
    .bind(movement.quantity.movement_type().as_str())
    .bind(movement.quantity.stored_quantity())
    .bind(movement.user_id)
    .bind(&movement.reason)
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!(
        movement_id = %row.id,
        product_id = %row.product_id,
        movement_type = %row.movement_type,
        quantity = row.quantity,
        "Movement recorded"
    );

    Ok(row)
}
