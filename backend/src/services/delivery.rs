//! Delivery workflow
//!
//! Deliveries ship fixed lines out of one warehouse to an institution. Marking
//! one delivered takes stock out of the warehouse and the product total for
//! every line, or for none of them.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    delivery_processing_order, generate_document_number, validate_delivery_lines,
    DeliveryLineInput, DeliveryStatus, DocumentKind, MovementQuantity,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::purchase_order::ensure_products_exist;
use crate::services::stock::{self, NewMovement};

/// Delivery service
#[derive(Clone)]
pub struct DeliveryService {
    db: PgPool,
}

/// Delivery header
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Delivery {
    pub id: Uuid,
    pub delivery_number: String,
    pub institution_id: Uuid,
    pub warehouse_id: Uuid,
    pub status: String,
    pub delivery_date: Option<DateTime<Utc>>,
    pub received_by: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    pub fn status(&self) -> AppResult<DeliveryStatus> {
        Ok(self.status.parse()?)
    }
}

/// Delivery line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DeliveryItem {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Delivery with its lines
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryWithItems {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub items: Vec<DeliveryItem>,
}

/// Input for creating a delivery
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDeliveryInput {
    pub institution_id: Uuid,
    pub warehouse_id: Uuid,
    pub items: Vec<DeliveryLineInput>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Input for marking a delivery as delivered
#[derive(Debug, Default, Deserialize, Validate)]
pub struct MarkDeliveredInput {
    #[validate(length(min = 1, max = 200))]
    pub received_by: Option<String>,
}

/// Filter for delivery listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryFilter {
    pub status: Option<DeliveryStatus>,
    pub institution_id: Option<Uuid>,
}

const DELIVERY_COLUMNS: &str = "id, delivery_number, institution_id, warehouse_id, status, \
     delivery_date, received_by, notes, created_by, created_at, updated_at";

impl DeliveryService {
    /// Create a new DeliveryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a DRAFT delivery with its lines
    pub async fn create_delivery(
        &self,
        user_id: Uuid,
        input: CreateDeliveryInput,
    ) -> AppResult<DeliveryWithItems> {
        input.validate()?;
        validate_delivery_lines(&input.items)?;

        let mut tx = self.db.begin().await?;

        let institution_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM institutions WHERE id = $1)")
                .bind(input.institution_id)
                .fetch_one(&mut *tx)
                .await?;
        if !institution_exists {
            return Err(AppError::NotFound("Institution".to_string()));
        }

        stock::active_warehouse(&mut *tx, input.warehouse_id).await?;
        ensure_products_exist(&mut *tx, input.items.iter().map(|l| l.product_id)).await?;

        let sequence = sqlx::query_scalar::<_, i64>("SELECT nextval('delivery_number_seq')")
            .fetch_one(&mut *tx)
            .await?;
        let delivery_number =
            generate_document_number(DocumentKind::Delivery, Utc::now().year(), sequence);

        let delivery = sqlx::query_as::<_, Delivery>(&format!(
            r#"
            INSERT INTO deliveries (delivery_number, institution_id, warehouse_id, status, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            DELIVERY_COLUMNS
        ))
        .bind(&delivery_number)
        .bind(input.institution_id)
        .bind(input.warehouse_id)
        .bind(DeliveryStatus::Draft.as_str())
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "delivery_number"))?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let item = sqlx::query_as::<_, DeliveryItem>(
                r#"
                INSERT INTO delivery_items (delivery_id, product_id, quantity)
                VALUES ($1, $2, $3)
                RETURNING id, delivery_id, product_id, quantity
                "#,
            )
            .bind(delivery.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }

        tx.commit().await?;

        tracing::info!(
            delivery_id = %delivery.id,
            delivery_number = %delivery.delivery_number,
            lines = items.len(),
            "Delivery created"
        );

        Ok(DeliveryWithItems { delivery, items })
    }

    /// DRAFT -> CONFIRMED
    pub async fn confirm_delivery(&self, delivery_id: Uuid) -> AppResult<DeliveryWithItems> {
        let mut tx = self.db.begin().await?;

        let delivery = lock_delivery(&mut *tx, delivery_id).await?;
        let next = delivery.status()?.confirm()?;
        let delivery = set_status(&mut *tx, delivery_id, next, None).await?;
        let items = load_items(&mut *tx, delivery_id).await?;

        tx.commit().await?;

        tracing::info!(delivery_number = %delivery.delivery_number, "Delivery confirmed");

        Ok(DeliveryWithItems { delivery, items })
    }

    /// Ship every line out of the warehouse
    pub async fn mark_as_delivered(
        &self,
        delivery_id: Uuid,
        user_id: Uuid,
        input: MarkDeliveredInput,
    ) -> AppResult<DeliveryWithItems> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let delivery = lock_delivery(&mut *tx, delivery_id).await?;
        let next = delivery.status()?.deliver()?;
        let items = load_items(&mut *tx, delivery_id).await?;

        let lines: Vec<DeliveryLineInput> = items
            .iter()
            .map(|i| DeliveryLineInput {
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .collect();

        for line in delivery_processing_order(&lines) {
            let product = stock::lock_product(&mut *tx, line.product_id).await?;
            stock::debit_warehouse(&mut *tx, delivery.warehouse_id, product.id, line.quantity)
                .await?;
            stock::adjust_product_stock(&mut *tx, &product, -i64::from(line.quantity)).await?;
            stock::append_movement(
                &mut *tx,
                NewMovement {
                    product_id: product.id,
                    warehouse_id: Some(delivery.warehouse_id),
                    quantity: MovementQuantity::Out(line.quantity),
                    user_id,
                    reason: Some(format!("Delivery {}", delivery.delivery_number)),
                },
            )
            .await?;
        }

        let received_by = input
            .received_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let delivery = set_status(&mut *tx, delivery_id, next, received_by).await?;

        tx.commit().await?;

        tracing::info!(
            delivery_number = %delivery.delivery_number,
            lines = items.len(),
            "Delivery completed"
        );

        Ok(DeliveryWithItems { delivery, items })
    }

    /// Cancel a delivery; stock is never touched
    pub async fn cancel_delivery(&self, delivery_id: Uuid) -> AppResult<DeliveryWithItems> {
        let mut tx = self.db.begin().await?;

        let delivery = lock_delivery(&mut *tx, delivery_id).await?;
        let next = delivery.status()?.cancel()?;
        let delivery = set_status(&mut *tx, delivery_id, next, None).await?;
        let items = load_items(&mut *tx, delivery_id).await?;

        tx.commit().await?;

        tracing::info!(delivery_number = %delivery.delivery_number, "Delivery cancelled");

        Ok(DeliveryWithItems { delivery, items })
    }

    /// Get a delivery with its lines
    pub async fn get_delivery(&self, delivery_id: Uuid) -> AppResult<DeliveryWithItems> {
        let mut conn = self.db.acquire().await?;

        let delivery = sqlx::query_as::<_, Delivery>(&format!(
            "SELECT {} FROM deliveries WHERE id = $1",
            DELIVERY_COLUMNS
        ))
        .bind(delivery_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Delivery".to_string()))?;

        let items = load_items(&mut *conn, delivery_id).await?;

        Ok(DeliveryWithItems { delivery, items })
    }

    /// List delivery headers, newest first
    pub async fn list_deliveries(&self, filter: &DeliveryFilter) -> AppResult<Vec<Delivery>> {
        let deliveries = sqlx::query_as::<_, Delivery>(&format!(
            r#"
            SELECT {}
            FROM deliveries
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR institution_id = $2)
            ORDER BY created_at DESC
            "#,
            DELIVERY_COLUMNS
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.institution_id)
        .fetch_all(&self.db)
        .await?;

        Ok(deliveries)
    }
}

async fn lock_delivery(conn: &mut PgConnection, delivery_id: Uuid) -> AppResult<Delivery> {
    sqlx::query_as::<_, Delivery>(&format!(
        "SELECT {} FROM deliveries WHERE id = $1 FOR UPDATE",
        DELIVERY_COLUMNS
    ))
    .bind(delivery_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Delivery".to_string()))
}

async fn load_items(conn: &mut PgConnection, delivery_id: Uuid) -> AppResult<Vec<DeliveryItem>> {
    let items = sqlx::query_as::<_, DeliveryItem>(
        r#"
        SELECT id, delivery_id, product_id, quantity
        FROM delivery_items
        WHERE delivery_id = $1
        ORDER BY product_id, id
        "#,
    )
    .bind(delivery_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

async fn set_status(
    conn: &mut PgConnection,
    delivery_id: Uuid,
    status: DeliveryStatus,
    received_by: Option<&str>,
) -> AppResult<Delivery> {
    let delivery = sqlx::query_as::<_, Delivery>(&format!(
        r#"
        UPDATE deliveries
        SET status = $2,
            updated_at = NOW(),
            delivery_date = CASE WHEN $2 = 'DELIVERED' THEN NOW() ELSE delivery_date END,
            received_by = COALESCE($3, received_by)
        WHERE id = $1
        RETURNING {}
        "#,
        DELIVERY_COLUMNS
    ))
    .bind(delivery_id)
    .bind(status.as_str())
    .bind(received_by)
    .fetch_one(&mut *conn)
    .await?;

    Ok(delivery)
}
