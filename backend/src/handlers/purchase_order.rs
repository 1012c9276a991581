//! HTTP handlers for purchase orders

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::purchase_order::{
    CreatePurchaseOrderInput, PurchaseOrder, PurchaseOrderFilter, PurchaseOrderService,
    PurchaseOrderWithItems, ReceivePurchaseOrderInput,
};
use crate::AppState;

/// Create a purchase order
pub async fn create_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> AppResult<(StatusCode, Json<PurchaseOrderWithItems>)> {
    let service = PurchaseOrderService::new(state.db);
    let order = service
        .create_purchase_order(current_user.id(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List purchase orders
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseOrderFilter>,
) -> AppResult<Json<Vec<PurchaseOrder>>> {
    let service = PurchaseOrderService::new(state.db);
    let orders = service.list_purchase_orders(&filter).await?;
    Ok(Json(orders))
}

/// Get a purchase order with its lines
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrderWithItems>> {
    let service = PurchaseOrderService::new(state.db);
    let order = service.get_purchase_order(order_id).await?;
    Ok(Json(order))
}

/// Submit a draft order
pub async fn submit_purchase_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrderWithItems>> {
    let service = PurchaseOrderService::new(state.db);
    let order = service.submit_purchase_order(order_id).await?;
    Ok(Json(order))
}

/// Receive goods against an order
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<ReceivePurchaseOrderInput>,
) -> AppResult<Json<PurchaseOrderWithItems>> {
    let service = PurchaseOrderService::new(state.db);
    let order = service
        .receive_purchase_order(order_id, current_user.id(), input)
        .await?;
    Ok(Json(order))
}

/// Cancel an order
pub async fn cancel_purchase_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrderWithItems>> {
    let service = PurchaseOrderService::new(state.db);
    let order = service.cancel_purchase_order(order_id).await?;
    Ok(Json(order))
}
