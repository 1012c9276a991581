//! Reporting handlers

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::services::reporting::{
    IntegrityReport, LowStockEntry, MovedProduct, ReportingService, TopMovedQuery,
    WarehouseTotal,
};
use crate::AppState;

/// Products at or below minimum stock
pub async fn get_low_stock(State(state): State<AppState>) -> AppResult<Json<Vec<LowStockEntry>>> {
    let service = ReportingService::new(state.db);
    Ok(Json(service.low_stock().await?))
}

/// Units held per warehouse
pub async fn get_warehouse_totals(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<WarehouseTotal>>> {
    let service = ReportingService::new(state.db);
    Ok(Json(service.warehouse_totals().await?))
}

/// Most-moved products
pub async fn get_top_moved(
    State(state): State<AppState>,
    Query(query): Query<TopMovedQuery>,
) -> AppResult<Json<Vec<MovedProduct>>> {
    let service = ReportingService::new(state.db);
    Ok(Json(service.top_moved(&query).await?))
}

/// Ledger consistency check
pub async fn get_integrity(State(state): State<AppState>) -> AppResult<Json<IntegrityReport>> {
    let service = ReportingService::new(state.db);
    Ok(Json(service.integrity_check().await?))
}
