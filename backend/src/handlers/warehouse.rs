//! HTTP handlers for the warehouse registry

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::warehouse::{
    CreateWarehouseInput, UpdateWarehouseInput, Warehouse, WarehouseService, WarehouseStockLine,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListWarehousesQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// Create a warehouse
pub async fn create_warehouse(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<CreateWarehouseInput>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    let service = WarehouseService::new(state.db);
    let warehouse = service.create_warehouse(input).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

/// List warehouses
pub async fn list_warehouses(
    State(state): State<AppState>,
    Query(query): Query<ListWarehousesQuery>,
) -> AppResult<Json<Vec<Warehouse>>> {
    let service = WarehouseService::new(state.db);
    let warehouses = service.list_warehouses(query.active_only).await?;
    Ok(Json(warehouses))
}

/// Get a warehouse
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Warehouse>> {
    let service = WarehouseService::new(state.db);
    let warehouse = service.get_warehouse(warehouse_id).await?;
    Ok(Json(warehouse))
}

/// Update a warehouse
pub async fn update_warehouse(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
    Json(input): Json<UpdateWarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    let service = WarehouseService::new(state.db);
    let warehouse = service.update_warehouse(warehouse_id, input).await?;
    Ok(Json(warehouse))
}

/// Delete an empty warehouse
pub async fn delete_warehouse(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = WarehouseService::new(state.db);
    service.delete_warehouse(warehouse_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stock rows held by a warehouse
pub async fn get_warehouse_stock(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Vec<WarehouseStockLine>>> {
    let service = WarehouseService::new(state.db);
    let lines = service.warehouse_stock(warehouse_id).await?;
    Ok(Json(lines))
}
