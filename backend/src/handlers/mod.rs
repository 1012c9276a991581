//! HTTP request handlers

pub mod delivery;
pub mod health;
pub mod movement;
pub mod partner;
pub mod product;
pub mod purchase_order;
pub mod reporting;
pub mod transfer;
pub mod warehouse;

pub use delivery::*;
pub use health::*;
pub use movement::*;
pub use partner::*;
pub use product::*;
pub use purchase_order::*;
pub use reporting::*;
pub use transfer::*;
pub use warehouse::*;
