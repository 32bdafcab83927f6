// models/src/medical/student.rs

use serde::{Deserialize, Serialize};

use crate::identifiers::StudentId;

/// A patient. Enrolled outside the request flow and read-only to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub email: String,
    pub branch: Option<String>,
    pub section: Option<String>,
}

/// A roster row as found in an enrollment file. Email defaults to the
/// institutional mailbox.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentEnrollment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
}
