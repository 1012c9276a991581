//! Movement log service
//!
//! Movements are append-only. Registering one updates the product total (and
//! the named warehouse row, if any) in the same transaction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    DateRange, DomainError, MovementQuantity, MovementType, PaginatedResponse, Pagination,
    PaginationMeta,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::stock::{self, NewMovement, MOVEMENT_COLUMNS};

/// Movement service for the stock audit trail
#[derive(Clone)]
pub struct MovementService {
    db: PgPool,
}

/// Immutable stock movement
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub movement_type: String,
    pub quantity: i32,
    pub user_id: Uuid,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Signed effect this movement had on stock
    pub fn signed_delta(&self) -> AppResult<i64> {
        let movement_type: MovementType = self.movement_type.parse()?;
        Ok(MovementQuantity::from_stored(movement_type, self.quantity).signed_delta())
    }
}

/// Input for registering a movement
#[derive(Debug, Deserialize)]
pub struct RegisterMovementInput {
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    #[serde(flatten)]
    pub quantity: MovementQuantity,
    pub reason: Option<String>,
}

/// Filter for movement queries; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub reason: Option<String>,
}

impl MovementFilter {
    /// Inclusive day bounds as `[start, end)` instants
    fn bounds(&self) -> AppResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        if let (Some(start), Some(end)) = (self.from, self.to) {
            let range = DateRange { start, end };
            if !range.is_valid() {
                return Err(DomainError::invalid_argument(
                    "from",
                    "Start date must not be after end date",
                )
                .into());
            }
        }

        let start = self.from.map(|d| DateRange { start: d, end: d }.starts_at());
        let end = self.to.map(|d| DateRange { start: d, end: d }.ends_before());
        Ok((start, end))
    }

    fn reason_pattern(&self) -> Option<String> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s))
    }
}

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::UUID IS NULL OR product_id = $1)
      AND ($2::UUID IS NULL OR warehouse_id = $2)
      AND ($3::UUID IS NULL OR user_id = $3)
      AND ($4::TEXT IS NULL OR movement_type = $4)
      AND ($5::TIMESTAMPTZ IS NULL OR created_at >= $5)
      AND ($6::TIMESTAMPTZ IS NULL OR created_at < $6)
      AND ($7::TEXT IS NULL OR reason ILIKE $7)
"#;

impl MovementService {
    /// Create a new MovementService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a manual movement
    ///
    /// With a warehouse the same delta lands on that warehouse row. Without
    /// one, a negative delta must be covered by unassigned stock.
    pub async fn register_movement(
        &self,
        user_id: Uuid,
        input: RegisterMovementInput,
    ) -> AppResult<StockMovement> {
        input.quantity.validate()?;
        let delta = input.quantity.signed_delta();

        let mut tx = self.db.begin().await?;

        let product = stock::lock_product(&mut *tx, input.product_id).await?;

        match input.warehouse_id {
            Some(warehouse_id) => {
                stock::find_warehouse(&mut *tx, warehouse_id).await?;
                stock::adjust_warehouse(&mut *tx, warehouse_id, product.id, delta).await?;
            }
            None if delta < 0 => {
                let unassigned = stock::unassigned_for(&mut *tx, &product).await?;
                if unassigned < -delta {
                    return Err(DomainError::InsufficientStock {
                        requested: -delta,
                        available: unassigned.max(0),
                    }
                    .into());
                }
            }
            None => {}
        }

        stock::adjust_product_stock(&mut *tx, &product, delta).await?;

        let movement = stock::append_movement(
            &mut *tx,
            NewMovement {
                product_id: product.id,
                warehouse_id: input.warehouse_id,
                quantity: input.quantity,
                user_id,
                reason: input.reason.filter(|r| !r.trim().is_empty()),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            movement_id = %movement.id,
            product_id = %movement.product_id,
            delta,
            "Manual movement registered"
        );

        Ok(movement)
    }

    /// Filtered, paginated movement query, newest first
    pub async fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<StockMovement>> {
        let (start, end) = filter.bounds()?;
        let movement_type = filter.movement_type.map(|t| t.as_str());
        let reason = filter.reason_pattern();

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM stock_movements {}",
            FILTER_CLAUSE
        ))
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .bind(filter.user_id)
        .bind(movement_type)
        .bind(start)
        .bind(end)
        .bind(&reason)
        .fetch_one(&self.db)
        .await?;

        let data = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements {} ORDER BY created_at DESC, id DESC LIMIT $8 OFFSET $9",
            MOVEMENT_COLUMNS, FILTER_CLAUSE
        ))
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .bind(filter.user_id)
        .bind(movement_type)
        .bind(start)
        .bind(end)
        .bind(&reason)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total_items = u64::try_from(total)
            .map_err(|_| AppError::Internal("Negative movement count".to_string()))?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(pagination, total_items),
        })
    }

    /// Full movement history of one product, newest first
    pub async fn product_history(&self, product_id: Uuid) -> AppResult<Vec<StockMovement>> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(&self.db)
            .await?;

        if !exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements WHERE product_id = $1 ORDER BY created_at DESC, id DESC",
            MOVEMENT_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(movements)
    }
}
