//! Inter-warehouse transfer workflow
//!
//! Stock leaves the source warehouse when the transfer is created and lands at
//! the destination on completion. The product total never changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{validate_transfer_request, MovementQuantity, TransferAction, TransferStatus};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::stock::{self, NewMovement};

/// Transfer service for moving stock between warehouses
#[derive(Clone)]
pub struct TransferService {
    db: PgPool,
}

/// Transfer of one product between two warehouses
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WarehouseTransfer {
    pub id: Uuid,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub status: String,
    pub user_id: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WarehouseTransfer {
    pub fn status(&self) -> AppResult<TransferStatus> {
        Ok(self.status.parse()?)
    }
}

/// Input for creating a transfer
#[derive(Debug, Deserialize)]
pub struct CreateTransferInput {
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub notes: Option<String>,
}

/// Filter for transfer listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferFilter {
    pub status: Option<TransferStatus>,
    pub warehouse_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
}

const TRANSFER_COLUMNS: &str = "id, from_warehouse_id, to_warehouse_id, product_id, quantity, \
     status, user_id, notes, created_at, completed_at";

impl TransferService {
    /// Create a new TransferService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a transfer and take the stock out of the source warehouse
    pub async fn create_transfer(
        &self,
        user_id: Uuid,
        input: CreateTransferInput,
    ) -> AppResult<WarehouseTransfer> {
        validate_transfer_request(input.from_warehouse_id, input.to_warehouse_id, input.quantity)?;

        let mut tx = self.db.begin().await?;

        // Product row before any warehouse row, the order every stock writer uses
        stock::lock_product(&mut *tx, input.product_id).await?;

        let from = stock::active_warehouse(&mut *tx, input.from_warehouse_id).await?;
        let to = stock::active_warehouse(&mut *tx, input.to_warehouse_id).await?;

        stock::debit_warehouse(&mut *tx, from.id, input.product_id, input.quantity).await?;

        stock::append_movement(
            &mut *tx,
            NewMovement {
                product_id: input.product_id,
                warehouse_id: Some(from.id),
                quantity: MovementQuantity::Out(input.quantity),
                user_id,
                reason: Some(format!("Transfer pending to {}", to.code)),
            },
        )
        .await?;

        let transfer = sqlx::query_as::<_, WarehouseTransfer>(&format!(
            r#"
            INSERT INTO warehouse_transfers
                (from_warehouse_id, to_warehouse_id, product_id, quantity, status, user_id, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            TRANSFER_COLUMNS
        ))
        .bind(from.id)
        .bind(to.id)
        .bind(input.product_id)
        .bind(input.quantity)
        .bind(TransferStatus::Pending.as_str())
        .bind(user_id)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            transfer_id = %transfer.id,
            from = %from.code,
            to = %to.code,
            quantity = transfer.quantity,
            "Transfer created"
        );

        Ok(transfer)
    }

    /// PENDING -> IN_TRANSIT
    pub async fn mark_in_transit(&self, transfer_id: Uuid) -> AppResult<WarehouseTransfer> {
        let mut tx = self.db.begin().await?;

        let transfer = lock_transfer(&mut *tx, transfer_id).await?;
        let next = transfer.status()?.apply(TransferAction::MarkInTransit)?;

        let transfer = set_status(&mut *tx, transfer_id, next).await?;

        tx.commit().await?;

        tracing::info!(transfer_id = %transfer_id, "Transfer in transit");

        Ok(transfer)
    }

    /// Land the stock at the destination warehouse
    pub async fn complete_transfer(
        &self,
        transfer_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<WarehouseTransfer> {
        let mut tx = self.db.begin().await?;

        let transfer = lock_transfer(&mut *tx, transfer_id).await?;
        let next = transfer.status()?.apply(TransferAction::Complete)?;
        stock::lock_product(&mut *tx, transfer.product_id).await?;

        let from = stock::find_warehouse(&mut *tx, transfer.from_warehouse_id).await?;

        stock::credit_warehouse(
            &mut *tx,
            transfer.to_warehouse_id,
            transfer.product_id,
            transfer.quantity,
        )
        .await?;

        stock::append_movement(
            &mut *tx,
            NewMovement {
                product_id: transfer.product_id,
                warehouse_id: Some(transfer.to_warehouse_id),
                quantity: MovementQuantity::In(transfer.quantity),
                user_id,
                reason: Some(format!("Transfer completed from {}", from.code)),
            },
        )
        .await?;

        let transfer = set_status(&mut *tx, transfer_id, next).await?;

        tx.commit().await?;

        tracing::info!(transfer_id = %transfer_id, quantity = transfer.quantity, "Transfer completed");

        Ok(transfer)
    }

    /// Return the stock to the source warehouse
    pub async fn cancel_transfer(
        &self,
        transfer_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<WarehouseTransfer> {
        let mut tx = self.db.begin().await?;

        let transfer = lock_transfer(&mut *tx, transfer_id).await?;
        let next = transfer.status()?.apply(TransferAction::Cancel)?;
        stock::lock_product(&mut *tx, transfer.product_id).await?;

        stock::credit_warehouse(
            &mut *tx,
            transfer.from_warehouse_id,
            transfer.product_id,
            transfer.quantity,
        )
        .await?;

        stock::append_movement(
            &mut *tx,
            NewMovement {
                product_id: transfer.product_id,
                warehouse_id: Some(transfer.from_warehouse_id),
                quantity: MovementQuantity::In(transfer.quantity),
                user_id,
                reason: Some("Transfer cancelled, stock returned".to_string()),
            },
        )
        .await?;

        let transfer = set_status(&mut *tx, transfer_id, next).await?;

        tx.commit().await?;

        tracing::info!(transfer_id = %transfer_id, quantity = transfer.quantity, "Transfer cancelled");

        Ok(transfer)
    }

    /// Get a transfer by id
    pub async fn get_transfer(&self, transfer_id: Uuid) -> AppResult<WarehouseTransfer> {
        sqlx::query_as::<_, WarehouseTransfer>(&format!(
            "SELECT {} FROM warehouse_transfers WHERE id = $1",
            TRANSFER_COLUMNS
        ))
        .bind(transfer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer".to_string()))
    }

    /// List transfers, newest first
    ///
    /// `warehouse_id` matches either end of the transfer.
    pub async fn list_transfers(&self, filter: &TransferFilter) -> AppResult<Vec<WarehouseTransfer>> {
        let transfers = sqlx::query_as::<_, WarehouseTransfer>(&format!(
            r#"
            SELECT {}
            FROM warehouse_transfers
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR from_warehouse_id = $2 OR to_warehouse_id = $2)
              AND ($3::UUID IS NULL OR product_id = $3)
            ORDER BY created_at DESC
            "#,
            TRANSFER_COLUMNS
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.warehouse_id)
        .bind(filter.product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(transfers)
    }
}

/// Lock a transfer row so concurrent transitions serialize
async fn lock_transfer(conn: &mut PgConnection, transfer_id: Uuid) -> AppResult<WarehouseTransfer> {
    sqlx::query_as::<_, WarehouseTransfer>(&format!(
        "SELECT {} FROM warehouse_transfers WHERE id = $1 FOR UPDATE",
        TRANSFER_COLUMNS
    ))
    .bind(transfer_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Transfer".to_string()))
}

async fn set_status(
    conn: &mut PgConnection,
    transfer_id: Uuid,
    status: TransferStatus,
) -> AppResult<WarehouseTransfer> {
    let transfer = sqlx::query_as::<_, WarehouseTransfer>(&format!(
        r#"
        UPDATE warehouse_transfers
        SET status = $2,
            completed_at = CASE WHEN $2 = 'COMPLETED' THEN NOW() ELSE completed_at END
        WHERE id = $1
        RETURNING {}
        "#,
        TRANSFER_COLUMNS
    ))
    .bind(transfer_id)
    .bind(status.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(transfer)
}
