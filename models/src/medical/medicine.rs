// models/src/medical/medicine.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::identifiers::RecordId;

/// Dosage forms stocked by the pharmacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MedicineCategory {
    Tablet,
    Capsule,
    Syrup,
    Ointment,
    Cream,
    Injection,
    Drops,
    Powder,
    Lozenge,
    Gel,
}

impl MedicineCategory {
    pub const ALL: [MedicineCategory; 10] = [
        MedicineCategory::Tablet,
        MedicineCategory::Capsule,
        MedicineCategory::Syrup,
        MedicineCategory::Ointment,
        MedicineCategory::Cream,
        MedicineCategory::Injection,
        MedicineCategory::Drops,
        MedicineCategory::Powder,
        MedicineCategory::Lozenge,
        MedicineCategory::Gel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MedicineCategory::Tablet => "Tablet",
            MedicineCategory::Capsule => "Capsule",
            MedicineCategory::Syrup => "Syrup",
            MedicineCategory::Ointment => "Ointment",
            MedicineCategory::Cream => "Cream",
            MedicineCategory::Injection => "Injection",
            MedicineCategory::Drops => "Drops",
            MedicineCategory::Powder => "Powder",
            MedicineCategory::Lozenge => "Lozenge",
            MedicineCategory::Gel => "Gel",
        }
    }
}

impl fmt::Display for MedicineCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MedicineCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MedicineCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::invalid("category", format!("unknown category '{}'", s)))
    }
}

/// An inventory item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: RecordId,
    pub name: String,
    pub category: MedicineCategory,
    pub quantity: u32,
    pub expiry_date: NaiveDate,
    /// Deleted from the inventory while still referenced by prescriptions.
    pub retired: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields of a medicine about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMedicine {
    pub name: String,
    pub category: MedicineCategory,
    pub quantity: u32,
    pub expiry_date: NaiveDate,
}

/// Add-medicine payload as received. Quantity is signed so that a negative
/// count is reported as a validation failure rather than a decode failure.
#[derive(Debug, Clone, Deserialize)]
pub struct MedicineInput {
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub expiry_date: String,
}

/// Partial edit; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicinePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub expiry_date: Option<String>,
}

/// Stock level derived from the quantity on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    Critical,
    Low,
    Good,
}
