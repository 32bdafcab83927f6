// models/src/medical/lab_report.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::RecordId;
use crate::medical::status::LabReportStatus;

/// A single requested diagnostic test and its eventual result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabReport {
    pub id: RecordId,
    pub prescription_id: RecordId,
    pub test_name: String,
    pub status: LabReportStatus,
    /// Reference to the stored result artifact.
    pub result: Option<String>,
    pub technician_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLabReport {
    pub prescription_id: RecordId,
    pub test_name: String,
}
