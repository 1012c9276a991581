//! Common types used across the ledger

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl Pagination {
    /// Upper bound on page size accepted from callers
    pub const MAX_PER_PAGE: u32 = 200;

    /// Build pagination from optional query parameters, clamping to sane bounds
    pub fn from_query(page: Option<u32>, per_page: Option<u32>) -> Self {
        let defaults = Self::default();
        Self {
            page: page.unwrap_or(defaults.page).max(1),
            per_page: per_page
                .unwrap_or(defaults.per_page)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(pagination: &Pagination, total_items: u64) -> Self {
        let per_page = u64::from(pagination.per_page.max(1));
        let total_pages = total_items.div_ceil(per_page);
        Self {
            page: pagination.page,
            per_page: pagination.per_page,
            total_items,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
        }
    }
}

/// Inclusive date range for queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// First instant of the range (start of `start` day, UTC)
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.start.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Exclusive upper bound (start of the day after `end`, UTC)
    pub fn ends_before(&self) -> DateTime<Utc> {
        self.end
            .succ_opt()
            .unwrap_or(self.end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

/// Prefix of a human-readable document number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PurchaseOrder,
    Delivery,
}

impl DocumentKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::PurchaseOrder => "PO",
            DocumentKind::Delivery => "DL",
        }
    }
}

/// Generate a document number (e.g., "PO-2024-000042")
///
/// `sequence` comes from a database sequence, so numbers stay unique under
/// concurrent creation.
pub fn generate_document_number(kind: DocumentKind, year: i32, sequence: i64) -> String {
    format!("{}-{}-{:06}", kind.prefix(), year, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_offset() {
        let p = Pagination { page: 3, per_page: 25 };
        assert_eq!(p.offset(), 50);
        assert_eq!(p.limit(), 25);
    }

    #[test]
    fn test_pagination_from_query_clamps() {
        let p = Pagination::from_query(Some(0), Some(10_000));
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, Pagination::MAX_PER_PAGE);

        let p = Pagination::from_query(None, None);
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 20);
    }

    #[test]
    fn test_pagination_meta_total_pages() {
        let p = Pagination { page: 1, per_page: 20 };
        assert_eq!(PaginationMeta::new(&p, 0).total_pages, 0);
        assert_eq!(PaginationMeta::new(&p, 20).total_pages, 1);
        assert_eq!(PaginationMeta::new(&p, 21).total_pages, 2);
    }

    #[test]
    fn test_date_range_bounds() {
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        };
        assert!(range.is_valid());
        assert_eq!(range.starts_at().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(range.ends_before().to_rfc3339(), "2024-04-01T00:00:00+00:00");
    }

    #[test]
    fn test_generate_document_number() {
        assert_eq!(
            generate_document_number(DocumentKind::PurchaseOrder, 2024, 42),
            "PO-2024-000042"
        );
        assert_eq!(
            generate_document_number(DocumentKind::Delivery, 2025, 1),
            "DL-2025-000001"
        );
    }
}
