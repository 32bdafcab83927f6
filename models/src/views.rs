// models/src/views.rs

//! Read models returned by the query service. Nothing here is persisted.

use serde::Serialize;

use crate::medical::{LabReport, Medicine, Prescription, PrescriptionMedicine, StockStatus, Student};

/// A related record that may be missing. Detail views render the placeholder
/// instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Relation<T> {
    Available { record: T },
    Unavailable { reason: String },
}

impl<T> Relation<T> {
    pub fn from_option(value: Option<T>, reason: impl FnOnce() -> String) -> Self {
        match value {
            Some(record) => Relation::Available { record },
            None => Relation::Unavailable { reason: reason() },
        }
    }

    pub fn as_available(&self) -> Option<&T> {
        match self {
            Relation::Available { record } => Some(record),
            Relation::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicineLineDetail {
    #[serde(flatten)]
    pub line: PrescriptionMedicine,
    pub medicine: Relation<Medicine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrescriptionDetail {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub student: Relation<Student>,
    pub medicines: Vec<MedicineLineDetail>,
    pub lab_reports: Vec<LabReport>,
}

/// List row for prescription queues.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrescriptionSummary {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub student_name: Option<String>,
}

/// List row for the lab technician queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabReportSummary {
    #[serde(flatten)]
    pub report: LabReport,
    pub student_id: Option<String>,
    pub student_name: Option<String>,
    pub notes: Option<String>,
}

/// Inventory row with its derived predicates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicineView {
    #[serde(flatten)]
    pub medicine: Medicine,
    pub stock_status: StockStatus,
    pub expiring_soon: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_prescriptions: usize,
    pub pending_prescriptions: usize,
    pub completed_prescriptions: usize,
    pub lab_reports_requested: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_relation_renders_placeholder() {
        let rel: Relation<Student> = Relation::from_option(None, || "student R200137 not found".into());
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "student R200137 not found");
        assert!(rel.as_available().is_none());
    }
}
