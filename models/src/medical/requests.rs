// models/src/medical/requests.rs

//! Payloads of the lifecycle operations as the dashboards send them.

use serde::Deserialize;

use crate::identifiers::RecordId;

/// One medicine row of the doctor's form. Rows without a medicine or with a
/// non-positive quantity are dropped, not rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicineLineInput {
    #[serde(default)]
    pub medicine_id: Option<RecordId>,
    #[serde(default)]
    pub quantity: i64,
}

/// The doctor's review submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorUpdate {
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub medicines: Vec<MedicineLineInput>,
    #[serde(default)]
    pub lab_tests: Vec<String>,
}

/// Attach a single medicine line to an existing prescription.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachMedicine {
    pub prescription_id: RecordId,
    pub medicine_id: RecordId,
    pub quantity: i64,
}

/// Request a single lab test on an existing prescription.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestLabTest {
    pub prescription_id: RecordId,
    pub test_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabResultInput {
    /// Reference to the uploaded result artifact.
    pub result: String,
}

/// Units of one prescription line handed over now. Added to what was
/// already issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IssueLine {
    pub prescription_medicine_id: RecordId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueRequest {
    pub lines: Vec<IssueLine>,
}
