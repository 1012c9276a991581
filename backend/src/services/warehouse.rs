//! Warehouse registry service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{normalize_code, validate_warehouse_code};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::stock::WAREHOUSE_COLUMNS;

/// Warehouse service for named stock locations
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// Named stock location
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Warehouse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a warehouse
#[derive(Debug, Deserialize, Validate)]
pub struct CreateWarehouseInput {
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

/// Input for updating a warehouse
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateWarehouseInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

/// Stock row of a warehouse with product details
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WarehouseStockLine {
    pub product_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a warehouse; the code is stored upper-cased
    pub async fn create_warehouse(&self, input: CreateWarehouseInput) -> AppResult<Warehouse> {
        input.validate()?;

        let code = normalize_code(&input.code);
        validate_warehouse_code(&code)?;

        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            "INSERT INTO warehouses (code, name) VALUES ($1, $2) RETURNING {}",
            WAREHOUSE_COLUMNS
        ))
        .bind(&code)
        .bind(input.name.trim())
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "code"))?;

        tracing::info!(warehouse_id = %warehouse.id, code = %warehouse.code, "Warehouse created");

        Ok(warehouse)
    }

    /// Get a warehouse by id
    pub async fn get_warehouse(&self, warehouse_id: Uuid) -> AppResult<Warehouse> {
        sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {} FROM warehouses WHERE id = $1",
            WAREHOUSE_COLUMNS
        ))
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    /// List warehouses
    pub async fn list_warehouses(&self, active_only: bool) -> AppResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {} FROM warehouses WHERE ($1 = FALSE OR is_active) ORDER BY code",
            WAREHOUSE_COLUMNS
        ))
        .bind(active_only)
        .fetch_all(&self.db)
        .await?;

        Ok(warehouses)
    }

    /// Rename or (de)activate a warehouse
    pub async fn update_warehouse(
        &self,
        warehouse_id: Uuid,
        input: UpdateWarehouseInput,
    ) -> AppResult<Warehouse> {
        input.validate()?;

        let existing = self.get_warehouse(warehouse_id).await?;
        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.name)
            .to_string();
        let is_active = input.is_active.unwrap_or(existing.is_active);

        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            r#"
            UPDATE warehouses
            SET name = $2, is_active = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            WAREHOUSE_COLUMNS
        ))
        .bind(warehouse_id)
        .bind(&name)
        .bind(is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        Ok(warehouse)
    }

    /// Delete an empty, unreferenced warehouse
    ///
    /// Movements keep their history with the warehouse reference cleared.
    pub async fn delete_warehouse(&self, warehouse_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {} FROM warehouses WHERE id = $1 FOR UPDATE",
            WAREHOUSE_COLUMNS
        ))
        .bind(warehouse_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        let (held, transfers, orders, deliveries) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM warehouse_stock WHERE warehouse_id = $1),
                (SELECT COUNT(*) FROM warehouse_transfers
                 WHERE from_warehouse_id = $1 OR to_warehouse_id = $1),
                (SELECT COUNT(*) FROM purchase_orders WHERE warehouse_id = $1),
                (SELECT COUNT(*) FROM deliveries WHERE warehouse_id = $1)
            "#,
        )
        .bind(warehouse_id)
        .fetch_one(&mut *tx)
        .await?;

        if held > 0 {
            return Err(AppError::conflicting_delete(
                "warehouse",
                format!("Warehouse {} still holds {} unit(s)", warehouse.code, held),
            ));
        }
        if transfers > 0 || orders > 0 || deliveries > 0 {
            return Err(AppError::conflicting_delete(
                "warehouse",
                format!(
                    "Warehouse {} is referenced by {} transfer(s), {} purchase order(s) and {} delivery record(s)",
                    warehouse.code, transfers, orders, deliveries
                ),
            ));
        }

        sqlx::query("DELETE FROM warehouse_stock WHERE warehouse_id = $1")
            .bind(warehouse_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(warehouse_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::from_delete_violation(e, "warehouse"))?;

        tx.commit().await?;

        tracing::info!(warehouse_id = %warehouse_id, code = %warehouse.code, "Warehouse deleted");

        Ok(())
    }

    /// Stock rows held by a warehouse
    pub async fn warehouse_stock(&self, warehouse_id: Uuid) -> AppResult<Vec<WarehouseStockLine>> {
        self.get_warehouse(warehouse_id).await?;

        let lines = sqlx::query_as::<_, WarehouseStockLine>(
            r#"
            SELECT ws.product_id, p.sku, p.name AS product_name, ws.quantity, ws.updated_at
            FROM warehouse_stock ws
            JOIN products p ON p.id = ws.product_id
            WHERE ws.warehouse_id = $1
            ORDER BY p.sku
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(lines)
    }
}
