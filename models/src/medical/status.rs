// models/src/medical/status.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Lifecycle status of a prescription. The wire form is the human-readable
/// label the dashboards display and filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrescriptionStatus {
    #[serde(rename = "Initiated by Nurse")]
    InitiatedByNurse,
    #[serde(rename = "Prescribed by Doctor")]
    PrescribedByDoctor,
    #[serde(rename = "Lab Test Requested")]
    LabTestRequested,
    #[serde(rename = "Prescribed and Lab Test Requested")]
    PrescribedAndLabTestRequested,
    #[serde(rename = "Lab Test Completed")]
    LabTestCompleted,
    #[serde(rename = "Medication Issued")]
    MedicationIssued,
}

impl PrescriptionStatus {
    pub const ALL: [PrescriptionStatus; 6] = [
        PrescriptionStatus::InitiatedByNurse,
        PrescriptionStatus::PrescribedByDoctor,
        PrescriptionStatus::LabTestRequested,
        PrescriptionStatus::PrescribedAndLabTestRequested,
        PrescriptionStatus::LabTestCompleted,
        PrescriptionStatus::MedicationIssued,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::InitiatedByNurse => "Initiated by Nurse",
            PrescriptionStatus::PrescribedByDoctor => "Prescribed by Doctor",
            PrescriptionStatus::LabTestRequested => "Lab Test Requested",
            PrescriptionStatus::PrescribedAndLabTestRequested => "Prescribed and Lab Test Requested",
            PrescriptionStatus::LabTestCompleted => "Lab Test Completed",
            PrescriptionStatus::MedicationIssued => "Medication Issued",
        }
    }

    /// True once a doctor has acted on the record.
    pub fn requires_doctor(&self) -> bool {
        !matches!(self, PrescriptionStatus::InitiatedByNurse)
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the exact, case-sensitive label. Anything else is rejected.
impl FromStr for PrescriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrescriptionStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownStatus(s.to_string()))
    }
}

/// Status of a single lab report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabReportStatus {
    #[serde(rename = "Lab Test Requested")]
    Requested,
    #[serde(rename = "Lab Test Completed")]
    Completed,
}

impl LabReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabReportStatus::Requested => "Lab Test Requested",
            LabReportStatus::Completed => "Lab Test Completed",
        }
    }
}

impl fmt::Display for LabReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabReportStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Lab Test Requested" => Ok(LabReportStatus::Requested),
            "Lab Test Completed" => Ok(LabReportStatus::Completed),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}
