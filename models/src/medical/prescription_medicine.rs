// models/src/medical/prescription_medicine.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::RecordId;

/// One medicine line of a prescription. Owned by its prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionMedicine {
    pub id: RecordId,
    pub prescription_id: RecordId,
    pub medicine_id: RecordId,
    pub quantity_prescribed: u32,
    /// Cumulative quantity dispensed; `None` until the first issuance.
    pub quantity_issued: Option<u32>,
    pub issued_by: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
}

impl PrescriptionMedicine {
    pub fn issued(&self) -> u32 {
        self.quantity_issued.unwrap_or(0)
    }

    pub fn outstanding(&self) -> u32 {
        self.quantity_prescribed.saturating_sub(self.issued())
    }
}

/// A line to be created by the store, which assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrescriptionMedicine {
    pub prescription_id: RecordId,
    pub medicine_id: RecordId,
    pub quantity_prescribed: u32,
}
