//! HTTP handlers for the movement log

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::{MovementType, PaginatedResponse, Pagination};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::movement::{
    MovementFilter, MovementService, RegisterMovementInput, StockMovement,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListMovementsQuery {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub reason: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Register a manual movement
pub async fn register_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RegisterMovementInput>,
) -> AppResult<(StatusCode, Json<StockMovement>)> {
    let service = MovementService::new(state.db);
    let movement = service.register_movement(current_user.id(), input).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// Query the movement log
pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<ListMovementsQuery>,
) -> AppResult<Json<PaginatedResponse<StockMovement>>> {
    let pagination = Pagination::from_query(query.page, query.per_page);
    let filter = MovementFilter {
        product_id: query.product_id,
        warehouse_id: query.warehouse_id,
        user_id: query.user_id,
        movement_type: query.movement_type,
        from: query.from,
        to: query.to,
        reason: query.reason,
    };

    let service = MovementService::new(state.db);
    let page = service.list_movements(&filter, &pagination).await?;
    Ok(Json(page))
}
