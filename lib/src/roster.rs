// lib/src/roster.rs

//! Student enrollment from a YAML roster. Enrollment is an operator task and
//! never runs inside the request flow.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Deserialize;
use serde_yaml2 as serde_yaml;

use models::medical::{Student, StudentEnrollment};
use models::{StudentId, ValidationResult};

use crate::storage_engine::RecordStore;

#[derive(Debug, Deserialize)]
struct RosterFile {
    #[serde(default)]
    students: Vec<StudentEnrollment>,
}

/// Parses a roster document of the form `students: [{id, name, ...}]`.
pub fn parse_roster(content: &str) -> Result<Vec<StudentEnrollment>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let roster: RosterFile = serde_yaml::from_str(content).map_err(|e| anyhow::anyhow!("Invalid roster YAML: {}", e))?;
    Ok(roster.students)
}

pub fn load_roster_yaml<P: AsRef<Path>>(path: P) -> Result<Vec<StudentEnrollment>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read roster {:?}", path))?;
    parse_roster(&content).with_context(|| format!("Failed to parse roster {:?}", path))
}

/// Normalizes one roster row. The email falls back to the institutional mailbox.
pub fn to_student(row: StudentEnrollment) -> ValidationResult<Student> {
    let id = StudentId::new(&row.id)?;
    let email = row
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| id.default_email());
    Ok(Student { id, name: row.name.trim().to_string(), email, branch: row.branch, section: row.section })
}

/// Writes every valid row and returns how many were stored. Rows with a
/// malformed identifier are skipped with a warning.
pub async fn enroll(store: &dyn RecordStore, rows: Vec<StudentEnrollment>) -> Result<usize> {
    let mut stored = 0;
    for row in rows {
        let raw_id = row.id.clone();
        match to_student(row) {
            Ok(student) => {
                store
                    .put_student(student)
                    .await
                    .with_context(|| format!("Failed to store student {}", raw_id))?;
                stored += 1;
            }
            Err(e) => warn!("Skipping roster row '{}': {}", raw_id, e),
        }
    }
    info!("Enrolled {} students", stored);
    Ok(stored)
}
