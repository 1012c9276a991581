//! HTTP handlers for the product catalog

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::movement::{MovementService, StockMovement};
use crate::services::product::{
    AssignStockInput, CreateProductInput, Product, ProductService, ProductStock,
    StockAssignmentResult, UpdateProductInput,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub search: Option<String>,
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let service = ProductService::new(state.db);
    let product = service.create_product(current_user.id(), input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let service = ProductService::new(state.db);
    let products = service.list_products(query.search.as_deref()).await?;
    Ok(Json(products))
}

/// Get a product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.update_product(product_id, input).await?;
    Ok(Json(product))
}

/// Delete a product and its stock history
pub async fn delete_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = ProductService::new(state.db);
    service.delete_product(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stock breakdown of a product
pub async fn get_product_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductStock>> {
    let service = ProductService::new(state.db);
    let stock = service.product_stock(product_id).await?;
    Ok(Json(stock))
}

/// Place stock into a warehouse
pub async fn assign_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<AssignStockInput>,
) -> AppResult<Json<StockAssignmentResult>> {
    let service = ProductService::new(state.db);
    let result = service
        .add_stock_to_warehouse(product_id, current_user.id(), input)
        .await?;
    Ok(Json(result))
}

/// Movement history of a product
pub async fn get_product_movements(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let service = MovementService::new(state.db);
    let movements = service.product_history(product_id).await?;
    Ok(Json(movements))
}
