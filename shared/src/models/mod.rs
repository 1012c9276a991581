//! Domain models for the Stock Ledger

mod delivery;
mod movement;
mod product;
mod purchase_order;
mod transfer;

pub use delivery::*;
pub use movement::*;
pub use product::*;
pub use purchase_order::*;
pub use transfer::*;
