//! Product catalog service
//!
//! Owns the authoritative `Product.stock` counter, product creation with
//! initial stock, and the assignment of stock into warehouses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    is_low_stock, validate_initial_stock, validate_price, validate_sku, MovementQuantity,
    StockAssignment,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::stock::{self, NewMovement, WarehouseStock, PRODUCT_COLUMNS};

/// Product service for catalog entries and stock assignment
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Catalog entry
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub price: Decimal,
    pub unit: String,
    pub min_stock: i32,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 50))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub price: Decimal,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    #[validate(range(min = 0))]
    pub min_stock: Option<i32>,
    pub initial_stock: Option<i32>,
    pub warehouse_id: Option<Uuid>,
}

/// Input for updating a product; stock is never updated here
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub price: Option<Decimal>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    #[validate(range(min = 0))]
    pub min_stock: Option<i32>,
}

/// Input for placing stock into a warehouse
#[derive(Debug, Deserialize)]
pub struct AssignStockInput {
    pub warehouse_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub is_new_stock: bool,
}

/// Per-warehouse quantity of a product
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WarehouseQuantity {
    pub warehouse_id: Uuid,
    pub warehouse_code: String,
    pub warehouse_name: String,
    pub quantity: i32,
}

/// Stock breakdown for one product
#[derive(Debug, Clone, Serialize)]
pub struct ProductStock {
    pub product_id: Uuid,
    pub sku: String,
    pub total: i32,
    pub warehouses: Vec<WarehouseQuantity>,
    pub in_transit: i64,
    pub unassigned: i64,
    pub low_stock: bool,
}

/// Result of placing stock into a warehouse
#[derive(Debug, Clone, Serialize)]
pub struct StockAssignmentResult {
    pub product: Product,
    pub warehouse_stock: WarehouseStock,
    pub movement: crate::services::movement::StockMovement,
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product, optionally seeding it with stock in one warehouse
    pub async fn create_product(
        &self,
        user_id: Uuid,
        input: CreateProductInput,
    ) -> AppResult<Product> {
        input.validate()?;

        let sku = input.sku.trim().to_string();
        validate_sku(&sku)?;
        validate_price("price", input.price)?;

        let initial_stock = input.initial_stock.unwrap_or(0);
        validate_initial_stock(initial_stock)?;

        let mut tx = self.db.begin().await?;

        // Checked before the insert so a bad warehouse never leaves a product behind
        if initial_stock > 0 {
            if let Some(warehouse_id) = input.warehouse_id {
                stock::active_warehouse(&mut *tx, warehouse_id).await?;
            }
        }

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (sku, name, price, unit, min_stock, stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&sku)
        .bind(input.name.trim())
        .bind(input.price)
        .bind(input.unit.as_deref().unwrap_or("unit"))
        .bind(input.min_stock.unwrap_or(0))
        .bind(initial_stock)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "sku"))?;

        // Without a warehouse the stock starts out unassigned
        if initial_stock > 0 {
            if let Some(warehouse_id) = input.warehouse_id {
                stock::credit_warehouse(&mut *tx, warehouse_id, product.id, initial_stock).await?;
            }
            stock::append_movement(
                &mut *tx,
                NewMovement {
                    product_id: product.id,
                    warehouse_id: input.warehouse_id,
                    quantity: MovementQuantity::In(initial_stock),
                    user_id,
                    reason: Some("Initial stock".to_string()),
                },
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(product_id = %product.id, sku = %product.sku, initial_stock, "Product created");

        Ok(product)
    }

    /// Get a product by id
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// List products, optionally filtered by a SKU/name substring
    pub async fn list_products(&self, search: Option<&str>) -> AppResult<Vec<Product>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {}
            FROM products
            WHERE ($1::TEXT IS NULL OR sku ILIKE $1 OR name ILIKE $1)
            ORDER BY sku
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(pattern)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    /// Update descriptive fields of a product
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        input.validate()?;
        if let Some(price) = input.price {
            validate_price("price", price)?;
        }

        let existing = self.get_product(product_id).await?;

        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.name)
            .to_string();
        let price = input.price.unwrap_or(existing.price);
        let unit = input.unit.unwrap_or(existing.unit);
        let min_stock = input.min_stock.unwrap_or(existing.min_stock);

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET name = $2, price = $3, unit = $4, min_stock = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(&name)
        .bind(price)
        .bind(&unit)
        .bind(min_stock)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(product)
    }

    /// Delete a product together with its movements, transfers and warehouse rows
    ///
    /// Refused while purchase-order or delivery lines reference it.
    pub async fn delete_product(&self, product_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let product = stock::lock_product(&mut *tx, product_id).await?;

        let (order_lines, delivery_lines) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM purchase_order_items WHERE product_id = $1),
                (SELECT COUNT(*) FROM delivery_items WHERE product_id = $1)
            "#,
        )
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        if order_lines > 0 || delivery_lines > 0 {
            return Err(AppError::conflicting_delete(
                "product",
                format!(
                    "Product {} is referenced by {} purchase order line(s) and {} delivery line(s)",
                    product.sku, order_lines, delivery_lines
                ),
            ));
        }

        sqlx::query("DELETE FROM stock_movements WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM warehouse_transfers WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM warehouse_stock WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::from_delete_violation(e, "product"))?;

        tx.commit().await?;

        tracing::info!(product_id = %product_id, sku = %product.sku, "Product deleted");

        Ok(())
    }

    /// Per-warehouse breakdown of a product's stock
    pub async fn product_stock(&self, product_id: Uuid) -> AppResult<ProductStock> {
        let product = self.get_product(product_id).await?;

        let warehouses = sqlx::query_as::<_, WarehouseQuantity>(
            r#"
            SELECT ws.warehouse_id, w.code AS warehouse_code, w.name AS warehouse_name, ws.quantity
            FROM warehouse_stock ws
            JOIN warehouses w ON w.id = ws.warehouse_id
            WHERE ws.product_id = $1
            ORDER BY w.code
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        let in_transit = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT
            FROM warehouse_transfers
            WHERE product_id = $1 AND status IN ('PENDING', 'IN_TRANSIT')
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        let in_warehouses: i64 = warehouses.iter().map(|w| i64::from(w.quantity)).sum();
        let unassigned =
            shared::unassigned_quantity(i64::from(product.stock), in_warehouses + in_transit);

        Ok(ProductStock {
            product_id: product.id,
            sku: product.sku,
            total: product.stock,
            low_stock: is_low_stock(product.stock, product.min_stock),
            warehouses,
            in_transit,
            unassigned,
        })
    }

    /// Unassigned quantity of a product
    pub async fn unassigned_quantity(&self, product_id: Uuid) -> AppResult<i64> {
        let mut conn = self.db.acquire().await?;
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        stock::unassigned_for(&mut *conn, &product).await
    }

    /// Place stock into a warehouse
    ///
    /// New stock grows both the warehouse and the product total. Otherwise the
    /// quantity is taken from the unassigned pool and only the warehouse grows.
    pub async fn add_stock_to_warehouse(
        &self,
        product_id: Uuid,
        user_id: Uuid,
        input: AssignStockInput,
    ) -> AppResult<StockAssignmentResult> {
        let assignment = StockAssignment::from_flag(input.is_new_stock);

        let mut tx = self.db.begin().await?;

        let mut product = stock::lock_product(&mut *tx, product_id).await?;
        stock::active_warehouse(&mut *tx, input.warehouse_id).await?;

        let unassigned = stock::unassigned_for(&mut *tx, &product).await?;
        assignment.check(input.quantity, unassigned)?;

        let warehouse_stock =
            stock::credit_warehouse(&mut *tx, input.warehouse_id, product_id, input.quantity)
                .await?;

        if assignment.touches_product_total() {
            product.stock =
                stock::adjust_product_stock(&mut *tx, &product, i64::from(input.quantity)).await?;
        }

        let movement = stock::append_movement(
            &mut *tx,
            NewMovement {
                product_id,
                warehouse_id: Some(input.warehouse_id),
                quantity: MovementQuantity::In(input.quantity),
                user_id,
                reason: Some(assignment.movement_reason().to_string()),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %product_id,
            warehouse_id = %input.warehouse_id,
            quantity = input.quantity,
            assignment = ?assignment,
            "Stock placed in warehouse"
        );

        Ok(StockAssignmentResult {
            product,
            warehouse_stock,
            movement,
        })
    }
}
