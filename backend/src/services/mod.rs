//! Business logic services for the Stock Ledger

pub mod delivery;
pub mod movement;
pub mod partner;
pub mod product;
pub mod purchase_order;
pub mod reporting;
pub mod stock;
pub mod transfer;
pub mod warehouse;

pub use delivery::DeliveryService;
pub use movement::MovementService;
pub use partner::{PartnerKind, PartnerService};
pub use product::ProductService;
pub use purchase_order::PurchaseOrderService;
pub use reporting::ReportingService;
pub use transfer::TransferService;
pub use warehouse::WarehouseService;
