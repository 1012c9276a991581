//! HTTP handlers for warehouse transfers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::transfer::{
    CreateTransferInput, TransferFilter, TransferService, WarehouseTransfer,
};
use crate::AppState;

/// Create a transfer
pub async fn create_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateTransferInput>,
) -> AppResult<(StatusCode, Json<WarehouseTransfer>)> {
    let service = TransferService::new(state.db);
    let transfer = service.create_transfer(current_user.id(), input).await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

/// List transfers
pub async fn list_transfers(
    State(state): State<AppState>,
    Query(filter): Query<TransferFilter>,
) -> AppResult<Json<Vec<WarehouseTransfer>>> {
    let service = TransferService::new(state.db);
    let transfers = service.list_transfers(&filter).await?;
    Ok(Json(transfers))
}

/// Get a transfer
pub async fn get_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<WarehouseTransfer>> {
    let service = TransferService::new(state.db);
    let transfer = service.get_transfer(transfer_id).await?;
    Ok(Json(transfer))
}

/// Mark a transfer as in transit
pub async fn mark_in_transit(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<WarehouseTransfer>> {
    let service = TransferService::new(state.db);
    let transfer = service.mark_in_transit(transfer_id).await?;
    Ok(Json(transfer))
}

/// Complete a transfer
pub async fn complete_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<WarehouseTransfer>> {
    let service = TransferService::new(state.db);
    let transfer = service
        .complete_transfer(transfer_id, current_user.id())
        .await?;
    Ok(Json(transfer))
}

/// Cancel a transfer
pub async fn cancel_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<WarehouseTransfer>> {
    let service = TransferService::new(state.db);
    let transfer = service.cancel_transfer(transfer_id, current_user.id()).await?;
    Ok(Json(transfer))
}
