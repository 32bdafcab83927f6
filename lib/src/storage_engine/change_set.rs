// lib/src/storage_engine/change_set.rs

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use models::medical::{AuditEntry, LabReport, Medicine, MedicineCategory, Prescription, PrescriptionMedicine};
use models::RecordId;

/// Outcome of an earlier keyed batch, kept so a retry can be answered
/// without applying the batch twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,
    pub prescription_id: RecordId,
    pub line_ids: Vec<RecordId>,
    pub lab_report_ids: Vec<RecordId>,
}

/// A line update guarded by the issued quantity the caller read.
#[derive(Debug, Clone, PartialEq)]
pub struct LineUpdate {
    pub line: PrescriptionMedicine,
    pub expected_issued: Option<u32>,
}

/// Everything one lifecycle step writes. The store applies it all or
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub prescription: Option<Prescription>,
    /// `prescription` is a new row. Otherwise the commit fails with
    /// `NotFound` when the row is gone.
    pub new_prescription: bool,
    pub new_lines: Vec<PrescriptionMedicine>,
    pub new_lab_reports: Vec<LabReport>,
    pub updated_lines: Vec<LineUpdate>,
    pub updated_lab_reports: Vec<LabReport>,
    /// Units to take from each medicine, already summed per medicine.
    pub stock_decrements: BTreeMap<RecordId, u32>,
    pub idempotency: Option<IdempotencyRecord>,
    pub audit: Vec<AuditEntry>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decrement(&mut self, medicine_id: RecordId, amount: u32) {
        let total = self.stock_decrements.entry(medicine_id).or_insert(0);
        *total = total.saturating_add(amount);
    }

    pub fn is_empty(&self) -> bool {
        self.prescription.is_none()
            && self.new_lines.is_empty()
            && self.new_lab_reports.is_empty()
            && self.updated_lines.is_empty()
            && self.updated_lab_reports.is_empty()
            && self.stock_decrements.is_empty()
    }
}

/// Validated field changes for one medicine row, applied by the store in a
/// single read-modify-write. Fields left `None` keep the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicineUpdate {
    pub name: Option<String>,
    pub category: Option<MedicineCategory>,
    pub quantity: Option<u32>,
    pub expiry_date: Option<NaiveDate>,
    pub retired: Option<bool>,
}

impl MedicineUpdate {
    pub fn is_empty(&self) -> bool {
        *self == MedicineUpdate::default()
    }

    pub fn apply(&self, medicine: &mut Medicine) {
        if let Some(name) = &self.name {
            medicine.name = name.clone();
        }
        if let Some(category) = self.category {
            medicine.category = category;
        }
        if let Some(quantity) = self.quantity {
            medicine.quantity = quantity;
        }
        if let Some(expiry_date) = self.expiry_date {
            medicine.expiry_date = expiry_date;
        }
        if let Some(retired) = self.retired {
            medicine.retired = retired;
        }
        medicine.updated_at = Utc::now();
    }

    /// Names of the fields this update touches, for the audit detail.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.category.is_some() {
            fields.push("category");
        }
        if self.quantity.is_some() {
            fields.push("quantity");
        }
        if self.expiry_date.is_some() {
            fields.push("expiry_date");
        }
        if self.retired.is_some() {
            fields.push("retired");
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Applied,
    /// The idempotency key was already used; nothing was written.
    Replayed(IdempotencyRecord),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrements_are_summed_per_medicine() {
        let mut changes = ChangeSet::new();
        changes.decrement(4, 3);
        changes.decrement(9, 1);
        changes.decrement(4, 2);
        assert_eq!(changes.stock_decrements.get(&4), Some(&5));
        assert_eq!(changes.stock_decrements.len(), 2);
        assert!(!changes.is_empty());
        assert!(ChangeSet::new().is_empty());
    }

    #[test]
    fn medicine_update_only_touches_present_fields() {
        let update = MedicineUpdate { name: Some("Cetirizine".into()), retired: Some(true), ..Default::default() };
        assert_eq!(update.changed_fields(), vec!["name", "retired"]);
        assert!(MedicineUpdate::default().is_empty());

        let created = Utc::now();
        let mut medicine = Medicine {
            id: 1,
            name: "Cetrizine".into(),
            category: MedicineCategory::Tablet,
            quantity: 13,
            expiry_date: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            retired: false,
            created_at: created,
            updated_at: created,
        };
        update.apply(&mut medicine);
        assert_eq!(medicine.name, "Cetirizine");
        assert_eq!(medicine.quantity, 13);
        assert!(medicine.retired);
    }
}
