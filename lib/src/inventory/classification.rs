// lib/src/inventory/classification.rs

//! Stock predicates. Derived on every read, never stored.

use chrono::NaiveDate;

use models::medical::{Medicine, StockStatus};
use models::views::MedicineView;

use crate::config::InventoryConfig;

pub fn stock_status(quantity: u32, config: &InventoryConfig) -> StockStatus {
    if quantity <= config.critical_threshold {
        StockStatus::Critical
    } else if quantity <= config.low_threshold {
        StockStatus::Low
    } else {
        StockStatus::Good
    }
}

/// Already-expired stock counts as expiring.
pub fn expiring_soon(expiry_date: NaiveDate, today: NaiveDate, config: &InventoryConfig) -> bool {
    (expiry_date - today).num_days() <= config.expiry_warning_days
}

pub fn medicine_view(medicine: Medicine, today: NaiveDate, config: &InventoryConfig) -> MedicineView {
    MedicineView {
        stock_status: stock_status(medicine.quantity, config),
        expiring_soon: expiring_soon(medicine.expiry_date, today, config),
        medicine,
    }
}
