//! Read-only stock reports

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{unassigned_quantity, DateRange};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Product at or below its minimum stock
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LowStockEntry {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub stock: i32,
    pub min_stock: i32,
}

/// Stock held by one warehouse
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct WarehouseTotal {
    pub warehouse_id: Uuid,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub product_count: i64,
    pub total_units: i64,
}

/// Product ranked by movement volume
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MovedProduct {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub movement_count: i64,
    pub units_moved: i64,
}

/// Stock balance of one product across the ledger
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductBalance {
    pub product_id: Uuid,
    pub sku: String,
    pub stock: i32,
    pub in_warehouses: i64,
    pub in_transit: i64,
    #[sqlx(skip)]
    pub unassigned: i64,
}

/// Result of the ledger consistency check
#[derive(Debug, Serialize)]
pub struct IntegrityReport {
    pub checked_products: usize,
    /// Products whose warehouses hold more than their total; always a bug
    pub violations: Vec<ProductBalance>,
    /// Products with stock not attributed to any warehouse
    pub unassigned: Vec<ProductBalance>,
    pub consistent: bool,
}

/// Query parameters for the top-moved report
#[derive(Debug, Default, Deserialize)]
pub struct TopMovedQuery {
    pub limit: Option<u32>,
    pub since: Option<NaiveDate>,
}

impl TopMovedQuery {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    fn limit(&self) -> i64 {
        i64::from(
            self.limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        )
    }

    fn since(&self) -> Option<DateTime<Utc>> {
        self.since.map(|d| DateRange { start: d, end: d }.starts_at())
    }
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Products whose stock is at or below their minimum
    pub async fn low_stock(&self) -> AppResult<Vec<LowStockEntry>> {
        let entries = sqlx::query_as::<_, LowStockEntry>(
            r#"
            SELECT id AS product_id, sku, name, stock, min_stock
            FROM products
            WHERE stock <= min_stock
            ORDER BY (min_stock - stock) DESC, sku
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    /// Units and distinct products held per warehouse
    pub async fn warehouse_totals(&self) -> AppResult<Vec<WarehouseTotal>> {
        let totals = sqlx::query_as::<_, WarehouseTotal>(
            r#"
            SELECT
                w.id AS warehouse_id,
                w.code,
                w.name,
                w.is_active,
                COUNT(ws.id) FILTER (WHERE ws.quantity > 0) AS product_count,
                COALESCE(SUM(ws.quantity), 0)::BIGINT AS total_units
            FROM warehouses w
            LEFT JOIN warehouse_stock ws ON ws.warehouse_id = w.id
            GROUP BY w.id, w.code, w.name, w.is_active
            ORDER BY w.code
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(totals)
    }

    /// Products ranked by total units moved
    pub async fn top_moved(&self, query: &TopMovedQuery) -> AppResult<Vec<MovedProduct>> {
        let products = sqlx::query_as::<_, MovedProduct>(
            r#"
            SELECT
                p.id AS product_id,
                p.sku,
                p.name,
                COUNT(m.id) AS movement_count,
                COALESCE(SUM(ABS(m.quantity)), 0)::BIGINT AS units_moved
            FROM stock_movements m
            JOIN products p ON p.id = m.product_id
            WHERE ($1::TIMESTAMPTZ IS NULL OR m.created_at >= $1)
            GROUP BY p.id, p.sku, p.name
            ORDER BY units_moved DESC, p.sku
            LIMIT $2
            "#,
        )
        .bind(query.since())
        .bind(query.limit())
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    /// Compare every product total with what its warehouses and transfers hold
    pub async fn integrity_check(&self) -> AppResult<IntegrityReport> {
        let mut balances = sqlx::query_as::<_, ProductBalance>(
            r#"
            SELECT
                p.id AS product_id,
                p.sku,
                p.stock,
                COALESCE(ws.total, 0)::BIGINT AS in_warehouses,
                COALESCE(t.total, 0)::BIGINT AS in_transit
            FROM products p
            LEFT JOIN (
                SELECT product_id, SUM(quantity) AS total
                FROM warehouse_stock
                GROUP BY product_id
            ) ws ON ws.product_id = p.id
            LEFT JOIN (
                SELECT product_id, SUM(quantity) AS total
                FROM warehouse_transfers
                WHERE status IN ('PENDING', 'IN_TRANSIT')
                GROUP BY product_id
            ) t ON t.product_id = p.id
            ORDER BY p.sku
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        for balance in &mut balances {
            balance.unassigned =
                unassigned_quantity(i64::from(balance.stock), balance.in_warehouses + balance.in_transit);
        }

        let report = build_integrity_report(balances);
        if !report.consistent {
            tracing::error!(
                violations = report.violations.len(),
                "Ledger integrity check found products with negative unassigned stock"
            );
        }

        Ok(report)
    }
}

fn build_integrity_report(balances: Vec<ProductBalance>) -> IntegrityReport {
    let checked_products = balances.len();
    let (violations, unassigned): (Vec<_>, Vec<_>) = balances
        .into_iter()
        .filter(|b| b.unassigned != 0)
        .partition(|b| b.unassigned < 0);

    IntegrityReport {
        checked_products,
        consistent: violations.is_empty(),
        violations,
        unassigned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(stock: i32, in_warehouses: i64, in_transit: i64) -> ProductBalance {
        ProductBalance {
            product_id: Uuid::new_v4(),
            sku: format!("SKU-{}", stock),
            stock,
            in_warehouses,
            in_transit,
            unassigned: unassigned_quantity(i64::from(stock), in_warehouses + in_transit),
        }
    }

    #[test]
    fn test_integrity_report_partitions_gaps() {
        let report = build_integrity_report(vec![
            balance(50, 50, 0),
            balance(80, 50, 0),
            balance(40, 30, 10),
            balance(10, 20, 0),
        ]);

        assert_eq!(report.checked_products, 4);
        assert_eq!(report.unassigned.len(), 1);
        assert_eq!(report.unassigned[0].unassigned, 30);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].unassigned, -10);
        assert!(!report.consistent);
    }

    #[test]
    fn test_top_moved_limit_is_clamped() {
        assert_eq!(TopMovedQuery::default().limit(), 10);
        let query = TopMovedQuery {
            limit: Some(5000),
            since: None,
        };
        assert_eq!(query.limit(), 100);
        let query = TopMovedQuery {
            limit: Some(0),
            since: None,
        };
        assert_eq!(query.limit(), 1);
    }
}
