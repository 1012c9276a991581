//! Shared types and domain rules for the Stock Ledger
//!
//! This crate holds everything that does not need a database: status enums and
//! their state machines, movement quantities, receipt planning and the input
//! validations used by the backend. Nothing here performs I/O.

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
