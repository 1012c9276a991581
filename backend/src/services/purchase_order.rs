//! Purchase order workflow
//!
//! Orders are numbered from a database sequence. Receipts are checked in full
//! before any row is written; the order status afterwards is derived from the
//! line state alone.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    apply_receipt, calculate_order_total, derive_order_status, generate_document_number,
    plan_receipt, validate_order_lines, DocumentKind, MovementQuantity, OrderLineInput,
    PurchaseLine, PurchaseOrderStatus, ReceiptEntry,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::stock::{self, NewMovement};

/// Purchase order service
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: PgPool,
}

/// Purchase order header
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub order_number: String,
    pub supplier_id: Uuid,
    pub warehouse_id: Uuid,
    pub status: String,
    pub total_amount: Decimal,
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub received_date: Option<DateTime<Utc>>,
}

impl PurchaseOrder {
    pub fn status(&self) -> AppResult<PurchaseOrderStatus> {
        Ok(self.status.parse()?)
    }
}

/// Purchase order line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseOrderItem {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub received_qty: i32,
}

impl From<&PurchaseOrderItem> for PurchaseLine {
    fn from(item: &PurchaseOrderItem) -> Self {
        PurchaseLine {
            item_id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            received_qty: item.received_qty,
        }
    }
}

/// Purchase order with its lines
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrderWithItems {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub items: Vec<PurchaseOrderItem>,
}

/// Input for creating a purchase order
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    pub warehouse_id: Uuid,
    pub items: Vec<OrderLineInput>,
    pub expected_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Input for receiving goods against an order
#[derive(Debug, Deserialize)]
pub struct ReceivePurchaseOrderInput {
    pub items: Vec<ReceiptEntry>,
}

/// Filter for order listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<Uuid>,
}

const ORDER_COLUMNS: &str = "id, order_number, supplier_id, warehouse_id, status, total_amount, \
     expected_date, notes, created_by, created_at, updated_at, received_date";

const ITEM_COLUMNS: &str = "id, purchase_order_id, product_id, quantity, unit_price, received_qty";

impl PurchaseOrderService {
    /// Create a new PurchaseOrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a DRAFT order with its lines
    pub async fn create_purchase_order(
        &self,
        user_id: Uuid,
        input: CreatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderWithItems> {
        input.validate()?;
        validate_order_lines(&input.items)?;
        let total_amount = calculate_order_total(&input.items);

        let mut tx = self.db.begin().await?;

        let supplier_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)")
                .bind(input.supplier_id)
                .fetch_one(&mut *tx)
                .await?;
        if !supplier_exists {
            return Err(AppError::NotFound("Supplier".to_string()));
        }

        stock::active_warehouse(&mut *tx, input.warehouse_id).await?;
        ensure_products_exist(&mut *tx, input.items.iter().map(|l| l.product_id)).await?;

        let sequence = sqlx::query_scalar::<_, i64>("SELECT nextval('purchase_order_number_seq')")
            .fetch_one(&mut *tx)
            .await?;
        let order_number =
            generate_document_number(DocumentKind::PurchaseOrder, Utc::now().year(), sequence);

        let order = sqlx::query_as::<_, PurchaseOrder>(&format!(
            r#"
            INSERT INTO purchase_orders
                (order_number, supplier_id, warehouse_id, status, total_amount, expected_date, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(&order_number)
        .bind(input.supplier_id)
        .bind(input.warehouse_id)
        .bind(PurchaseOrderStatus::Draft.as_str())
        .bind(total_amount)
        .bind(input.expected_date)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "order_number"))?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let item = sqlx::query_as::<_, PurchaseOrderItem>(&format!(
                r#"
                INSERT INTO purchase_order_items (purchase_order_id, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4)
                RETURNING {}
                "#,
                ITEM_COLUMNS
            ))
            .bind(order.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            lines = items.len(),
            total = %order.total_amount,
            "Purchase order created"
        );

        Ok(PurchaseOrderWithItems { order, items })
    }

    /// DRAFT -> PENDING
    pub async fn submit_purchase_order(&self, order_id: Uuid) -> AppResult<PurchaseOrderWithItems> {
        let mut tx = self.db.begin().await?;

        let order = lock_order(&mut *tx, order_id).await?;
        let next = order.status()?.submit()?;
        let order = set_status(&mut *tx, order_id, next).await?;
        let items = load_items(&mut *tx, order_id, false).await?;

        tx.commit().await?;

        tracing::info!(order_number = %order.order_number, "Purchase order submitted");

        Ok(PurchaseOrderWithItems { order, items })
    }

    /// Receive goods into the order's warehouse
    ///
    /// Every entry is checked against its line before anything is written, so
    /// a single over-receipt rejects the whole call.
    pub async fn receive_purchase_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        input: ReceivePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderWithItems> {
        let mut tx = self.db.begin().await?;

        let order = lock_order(&mut *tx, order_id).await?;
        let status = order.status()?;
        status.ensure_can_receive()?;

        let items = load_items(&mut *tx, order_id, true).await?;
        let lines: Vec<PurchaseLine> = items.iter().map(PurchaseLine::from).collect();
        let plan = plan_receipt(&lines, &input.items)?;

        for receipt in &plan {
            sqlx::query(
                "UPDATE purchase_order_items SET received_qty = received_qty + $2 WHERE id = $1",
            )
            .bind(receipt.item_id)
            .bind(receipt.quantity)
            .execute(&mut *tx)
            .await?;

            let product = stock::lock_product(&mut *tx, receipt.product_id).await?;
            stock::credit_warehouse(&mut *tx, order.warehouse_id, product.id, receipt.quantity)
                .await?;
            stock::adjust_product_stock(&mut *tx, &product, i64::from(receipt.quantity)).await?;
            stock::append_movement(
                &mut *tx,
                NewMovement {
                    product_id: product.id,
                    warehouse_id: Some(order.warehouse_id),
                    quantity: MovementQuantity::In(receipt.quantity),
                    user_id,
                    reason: Some(format!("Received from purchase order {}", order.order_number)),
                },
            )
            .await?;
        }

        let next = derive_order_status(status, &apply_receipt(&lines, &plan));
        let order = if next != status {
            set_status(&mut *tx, order_id, next).await?
        } else {
            order
        };
        let items = load_items(&mut *tx, order_id, false).await?;

        tx.commit().await?;

        tracing::info!(
            order_number = %order.order_number,
            lines_received = plan.len(),
            status = %order.status,
            "Purchase order received"
        );

        Ok(PurchaseOrderWithItems { order, items })
    }

    /// Cancel an order that has not received anything
    pub async fn cancel_purchase_order(&self, order_id: Uuid) -> AppResult<PurchaseOrderWithItems> {
        let mut tx = self.db.begin().await?;

        let order = lock_order(&mut *tx, order_id).await?;
        let items = load_items(&mut *tx, order_id, false).await?;
        let lines: Vec<PurchaseLine> = items.iter().map(PurchaseLine::from).collect();

        let next = order.status()?.cancel(&order.order_number, &lines)?;
        let order = set_status(&mut *tx, order_id, next).await?;

        tx.commit().await?;

        tracing::info!(order_number = %order.order_number, "Purchase order cancelled");

        Ok(PurchaseOrderWithItems { order, items })
    }

    /// Get an order with its lines
    pub async fn get_purchase_order(&self, order_id: Uuid) -> AppResult<PurchaseOrderWithItems> {
        let mut conn = self.db.acquire().await?;

        let order = sqlx::query_as::<_, PurchaseOrder>(&format!(
            "SELECT {} FROM purchase_orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let items = load_items(&mut *conn, order_id, false).await?;

        Ok(PurchaseOrderWithItems { order, items })
    }

    /// List order headers, newest first
    pub async fn list_purchase_orders(
        &self,
        filter: &PurchaseOrderFilter,
    ) -> AppResult<Vec<PurchaseOrder>> {
        let orders = sqlx::query_as::<_, PurchaseOrder>(&format!(
            r#"
            SELECT {}
            FROM purchase_orders
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR supplier_id = $2)
            ORDER BY created_at DESC
            "#,
            ORDER_COLUMNS
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.supplier_id)
        .fetch_all(&self.db)
        .await?;

        Ok(orders)
    }
}

/// NotFound unless every referenced product exists
pub(crate) async fn ensure_products_exist(
    conn: &mut PgConnection,
    product_ids: impl Iterator<Item = Uuid>,
) -> AppResult<()> {
    let mut ids: Vec<Uuid> = product_ids.collect();
    ids.sort();
    ids.dedup();

    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_one(&mut *conn)
        .await?;

    if found != ids.len() as i64 {
        return Err(AppError::NotFound("Product".to_string()));
    }
    Ok(())
}

async fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> AppResult<PurchaseOrder> {
    sqlx::query_as::<_, PurchaseOrder>(&format!(
        "SELECT {} FROM purchase_orders WHERE id = $1 FOR UPDATE",
        ORDER_COLUMNS
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))
}

async fn load_items(
    conn: &mut PgConnection,
    order_id: Uuid,
    for_update: bool,
) -> AppResult<Vec<PurchaseOrderItem>> {
    let items = sqlx::query_as::<_, PurchaseOrderItem>(&format!(
        "SELECT {} FROM purchase_order_items WHERE purchase_order_id = $1 ORDER BY product_id, id{}",
        ITEM_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

async fn set_status(
    conn: &mut PgConnection,
    order_id: Uuid,
    status: PurchaseOrderStatus,
) -> AppResult<PurchaseOrder> {
    let order = sqlx::query_as::<_, PurchaseOrder>(&format!(
        r#"
        UPDATE purchase_orders
        SET status = $2,
            updated_at = NOW(),
            received_date = CASE WHEN $2 = 'RECEIVED' THEN NOW() ELSE received_date END
        WHERE id = $1
        RETURNING {}
        "#,
        ORDER_COLUMNS
    ))
    .bind(order_id)
    .bind(status.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(order)
}
