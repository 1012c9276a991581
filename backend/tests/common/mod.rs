//! Shared fixtures for database-backed tests
//!
//! Tests that need PostgreSQL read `TEST_DATABASE_URL` and skip themselves
//! when it is not set. Every fixture uses fresh SKUs, codes and names so the
//! tests can share one database and run in parallel.

#![allow(dead_code)]

use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use ledger::services::partner::{CreatePartnerInput, Partner, PartnerService};
use ledger::services::product::{CreateProductInput, Product, ProductService};
use ledger::services::warehouse::{CreateWarehouseInput, Warehouse, WarehouseService};

/// Connect to the test database and apply migrations, or `None` to skip
pub async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("apply migrations");

    Some(pool)
}

/// Short upper-case suffix unique to this call
pub fn unique_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase()
}

pub fn user() -> Uuid {
    Uuid::new_v4()
}

pub async fn warehouse(pool: &PgPool, prefix: &str) -> Warehouse {
    WarehouseService::new(pool.clone())
        .create_warehouse(CreateWarehouseInput {
            code: format!("{}-{}", prefix, unique_suffix()),
            name: format!("Warehouse {}", prefix),
        })
        .await
        .expect("create warehouse")
}

/// Product seeded with `initial_stock` units in `warehouse`, or unassigned without one
pub async fn product(pool: &PgPool, sku: &str, initial_stock: i32, warehouse: Option<Uuid>) -> Product {
    ProductService::new(pool.clone())
        .create_product(
            user(),
            CreateProductInput {
                sku: format!("{}-{}", sku, unique_suffix()),
                name: format!("Product {}", sku),
                price: Decimal::new(1250, 2),
                unit: None,
                min_stock: Some(5),
                initial_stock: Some(initial_stock),
                warehouse_id: warehouse,
            },
        )
        .await
        .expect("create product")
}

pub async fn supplier(pool: &PgPool) -> Partner {
    PartnerService::suppliers(pool.clone())
        .create(partner_input("Supplier"))
        .await
        .expect("create supplier")
}

pub async fn institution(pool: &PgPool) -> Partner {
    PartnerService::institutions(pool.clone())
        .create(partner_input("Institution"))
        .await
        .expect("create institution")
}

fn partner_input(label: &str) -> CreatePartnerInput {
    CreatePartnerInput {
        name: format!("{} {}", label, unique_suffix()),
        contact_email: None,
        phone: None,
    }
}

/// Quantity a warehouse holds for a product, 0 when there is no row
pub async fn held(pool: &PgPool, warehouse_id: Uuid, product_id: Uuid) -> i32 {
    sqlx::query_scalar::<_, i32>(
        "SELECT quantity FROM warehouse_stock WHERE warehouse_id = $1 AND product_id = $2",
    )
    .bind(warehouse_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await
    .expect("read warehouse stock")
    .unwrap_or(0)
}
