//! HTTP handlers for institutional deliveries

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::delivery::{
    CreateDeliveryInput, Delivery, DeliveryFilter, DeliveryService, DeliveryWithItems,
    MarkDeliveredInput,
};
use crate::AppState;

/// Create a delivery
pub async fn create_delivery(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateDeliveryInput>,
) -> AppResult<(StatusCode, Json<DeliveryWithItems>)> {
    let service = DeliveryService::new(state.db);
    let delivery = service.create_delivery(current_user.id(), input).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

/// List deliveries
pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(filter): Query<DeliveryFilter>,
) -> AppResult<Json<Vec<Delivery>>> {
    let service = DeliveryService::new(state.db);
    let deliveries = service.list_deliveries(&filter).await?;
    Ok(Json(deliveries))
}

/// Get a delivery with its lines
pub async fn get_delivery(
    State(state): State<AppState>,
    Path(delivery_id): Path<Uuid>,
) -> AppResult<Json<DeliveryWithItems>> {
    let service = DeliveryService::new(state.db);
    let delivery = service.get_delivery(delivery_id).await?;
    Ok(Json(delivery))
}

/// Confirm a draft delivery
pub async fn confirm_delivery(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(delivery_id): Path<Uuid>,
) -> AppResult<Json<DeliveryWithItems>> {
    let service = DeliveryService::new(state.db);
    let delivery = service.confirm_delivery(delivery_id).await?;
    Ok(Json(delivery))
}

/// Mark a delivery as delivered; the body is optional
pub async fn mark_as_delivered(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(delivery_id): Path<Uuid>,
    input: Option<Json<MarkDeliveredInput>>,
) -> AppResult<Json<DeliveryWithItems>> {
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let service = DeliveryService::new(state.db);
    let delivery = service
        .mark_as_delivered(delivery_id, current_user.id(), input)
        .await?;
    Ok(Json(delivery))
}

/// Cancel a delivery
pub async fn cancel_delivery(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(delivery_id): Path<Uuid>,
) -> AppResult<Json<DeliveryWithItems>> {
    let service = DeliveryService::new(state.db);
    let delivery = service.cancel_delivery(delivery_id).await?;
    Ok(Json(delivery))
}
