//! Route definitions for the Stock Ledger API
//!
//! Reads are open; mutating handlers take a `CurrentUser` and reject requests
//! without an `X-User-Id` header.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::acting_user_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/products", product_routes())
        .nest("/warehouses", warehouse_routes())
        .nest("/movements", movement_routes())
        .nest("/transfers", transfer_routes())
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/deliveries", delivery_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/institutions", institution_routes())
        .nest("/reports", report_routes())
        .layer(middleware::from_fn(acting_user_middleware))
}

/// Product catalog routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/stock", get(handlers::get_product_stock))
        .route("/:product_id/assign", post(handlers::assign_stock))
        .route("/:product_id/movements", get(handlers::get_product_movements))
}

/// Warehouse registry routes
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_warehouses).post(handlers::create_warehouse))
        .route(
            "/:warehouse_id",
            get(handlers::get_warehouse)
                .put(handlers::update_warehouse)
                .delete(handlers::delete_warehouse),
        )
        .route("/:warehouse_id/stock", get(handlers::get_warehouse_stock))
}

/// Movement log routes
fn movement_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::list_movements).post(handlers::register_movement),
    )
}

/// Transfer workflow routes
fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_transfers).post(handlers::create_transfer))
        .route("/:transfer_id", get(handlers::get_transfer))
        .route("/:transfer_id/in-transit", post(handlers::mark_in_transit))
        .route("/:transfer_id/complete", post(handlers::complete_transfer))
        .route("/:transfer_id/cancel", post(handlers::cancel_transfer))
}

/// Purchase order workflow routes
fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route("/:order_id", get(handlers::get_purchase_order))
        .route("/:order_id/submit", post(handlers::submit_purchase_order))
        .route("/:order_id/receive", post(handlers::receive_purchase_order))
        .route("/:order_id/cancel", post(handlers::cancel_purchase_order))
}

/// Delivery workflow routes
fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_deliveries).post(handlers::create_delivery))
        .route("/:delivery_id", get(handlers::get_delivery))
        .route("/:delivery_id/confirm", post(handlers::confirm_delivery))
        .route("/:delivery_id/deliver", post(handlers::mark_as_delivered))
        .route("/:delivery_id/cancel", post(handlers::cancel_delivery))
}

/// Supplier registry routes
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:supplier_id",
            get(handlers::get_supplier).delete(handlers::delete_supplier),
        )
}

/// Institution registry routes
fn institution_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_institutions).post(handlers::create_institution),
        )
        .route(
            "/:institution_id",
            get(handlers::get_institution).delete(handlers::delete_institution),
        )
}

/// Read-only report routes
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/low-stock", get(handlers::get_low_stock))
        .route("/warehouse-totals", get(handlers::get_warehouse_totals))
        .route("/top-moved", get(handlers::get_top_moved))
        .route("/integrity", get(handlers::get_integrity))
}
