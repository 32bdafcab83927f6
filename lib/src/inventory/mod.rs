// lib/src/inventory/mod.rs

pub mod classification;
pub mod ledger;

pub use classification::{expiring_soon, medicine_view, stock_status};
pub use ledger::{validate_medicine_input, DeleteOutcome, InventoryLedger};
