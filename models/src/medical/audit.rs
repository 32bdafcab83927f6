// models/src/medical/audit.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identifiers::RecordId;
use crate::medical::role::{Actor, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    PrescriptionCreated,
    DoctorUpdated,
    LabResultRecorded,
    LabCompletionPropagated,
    MedicinesIssued,
    PrescriptionDeleted,
    MedicineAdded,
    MedicineEdited,
    MedicineDeleted,
    MedicineRetired,
    StockDecremented,
}

/// The record an audit entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRef {
    Prescription(RecordId),
    LabReport(RecordId),
    Medicine(RecordId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Prescription(id) => write!(f, "prescription/{}", id),
            EntityRef::LabReport(id) => write!(f, "lab_report/{}", id),
            EntityRef::Medicine(id) => write!(f, "medicine/{}", id),
        }
    }
}

/// Who changed what and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub actor_id: String,
    pub role: Role,
    pub action: AuditAction,
    pub entity: EntityRef,
    /// Related entity, e.g. the parent prescription of a lab report.
    pub parent: Option<EntityRef>,
    pub detail: String,
}

impl AuditEntry {
    pub fn new(actor: &Actor, action: AuditAction, entity: EntityRef, detail: impl Into<String>) -> Self {
        AuditEntry {
            id: Uuid::new_v4(),
            at: Utc::now(),
            actor_id: actor.id.clone(),
            role: actor.role,
            action,
            entity,
            parent: None,
            detail: detail.into(),
        }
    }

    pub fn with_parent(mut self, parent: EntityRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn concerns(&self, entity: &EntityRef) -> bool {
        &self.entity == entity || self.parent.as_ref() == Some(entity)
    }
}
