// lib/src/lifecycle/engine.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use serde::Serialize;

use models::medical::{
    Actor, AttachMedicine, AuditAction, AuditEntry, DoctorUpdate, EntityRef, IssueLine, LabReport, LabReportStatus,
    MedicineLineInput, NewLabReport, NewPrescription, NewPrescriptionMedicine, Prescription, PrescriptionMedicine,
    PrescriptionStatus, RequestLabTest,
};
use models::{HmsError, HmsResult, RecordId, StudentId, ValidationError};

use crate::audit::AuditTrail;
use crate::config::LifecycleConfig;
use crate::lifecycle::transitions::{next_status, LifecycleAction};
use crate::storage_engine::{ChangeSet, CommitOutcome, IdempotencyRecord, LineUpdate, RecordStore};

/// Result of a doctor update. `replayed` is set when an idempotency key
/// matched an earlier submission and nothing new was written.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorUpdateOutcome {
    pub prescription: Prescription,
    pub medicines: Vec<PrescriptionMedicine>,
    pub lab_reports: Vec<LabReport>,
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabResultOutcome {
    pub lab_report: LabReport,
    pub prescription_status: PrescriptionStatus,
    /// The parent prescription moved to `Lab Test Completed`.
    pub propagated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueOutcome {
    pub prescription: Prescription,
    pub medicines: Vec<PrescriptionMedicine>,
}

/// How a doctor update combines with what the prescription already carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttachMode {
    /// A full review submission; status follows what this submission attached.
    Submission,
    /// A single attachment; status also accounts for attachments implied by
    /// the current status.
    Append,
}

fn implied_attachments(status: PrescriptionStatus) -> (bool, bool) {
    match status {
        PrescriptionStatus::PrescribedByDoctor => (true, false),
        PrescriptionStatus::LabTestRequested => (false, true),
        PrescriptionStatus::PrescribedAndLabTestRequested => (true, true),
        _ => (false, false),
    }
}

fn valid_lines(prescription_id: RecordId, lines: &[MedicineLineInput]) -> HmsResult<Vec<NewPrescriptionMedicine>> {
    let mut kept = Vec::new();
    for line in lines {
        let medicine_id = match line.medicine_id {
            Some(id) if id != 0 => id,
            _ => continue,
        };
        if line.quantity <= 0 {
            continue;
        }
        let quantity_prescribed = u32::try_from(line.quantity)
            .map_err(|_| ValidationError::invalid("quantity", "is too large"))?;
        kept.push(NewPrescriptionMedicine { prescription_id, medicine_id, quantity_prescribed });
    }
    Ok(kept)
}

fn valid_lab_tests(prescription_id: RecordId, names: &[String]) -> Vec<NewLabReport> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| NewLabReport { prescription_id, test_name: name.to_string() })
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Applies role actions to prescriptions and enforces the transition table.
#[derive(Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn RecordStore>,
    audit: AuditTrail,
    config: LifecycleConfig,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn RecordStore>, audit: AuditTrail, config: LifecycleConfig) -> Self {
        LifecycleEngine { store, audit, config }
    }

    pub async fn get_prescription(&self, id: RecordId) -> HmsResult<Prescription> {
        self.store.get_prescription(id).await?.ok_or_else(|| HmsError::not_found("prescription", id))
    }

    async fn commit(&self, changes: ChangeSet) -> HmsResult<CommitOutcome> {
        let audit = changes.audit.clone();
        let outcome = self.store.commit(changes).await?;
        if outcome == CommitOutcome::Applied {
            self.audit.emit_all(&audit);
        }
        Ok(outcome)
    }

    /// Nurse intake.
    pub async fn create_prescription(&self, actor: &Actor, new: NewPrescription) -> HmsResult<Prescription> {
        let student_id = StudentId::new(&new.student_id)?;
        let chief_complaint = new.chief_complaint.trim().to_string();
        if chief_complaint.is_empty() {
            return Err(ValidationError::MissingField("chief_complaint".into()).into());
        }
        let vitals = new.vitals.normalized();
        vitals.validate()?;

        let now = Utc::now();
        let prescription = Prescription {
            id: self.store.next_id().await?,
            student_id,
            nurse_id: actor.id.clone(),
            doctor_id: None,
            chief_complaint,
            notes: non_blank(new.notes),
            vitals,
            status: PrescriptionStatus::InitiatedByNurse,
            created_at: now,
            updated_at: now,
        };
        let mut changes = ChangeSet::new();
        changes.audit.push(AuditEntry::new(
            actor,
            AuditAction::PrescriptionCreated,
            EntityRef::Prescription(prescription.id),
            format!("intake for {}", prescription.student_id),
        ));
        changes.prescription = Some(prescription.clone());
        changes.new_prescription = true;
        self.commit(changes).await?;
        info!("Prescription {} created for {}", prescription.id, prescription.student_id);
        Ok(prescription)
    }

    /// The doctor's review: notes, medicine lines and lab tests in one atomic
    /// commit. With an idempotency key, a retried submission returns the
    /// first outcome instead of attaching everything twice.
    pub async fn apply_doctor_update(
        &self,
        actor: &Actor,
        prescription_id: RecordId,
        update: DoctorUpdate,
        idempotency_key: Option<String>,
    ) -> HmsResult<DoctorUpdateOutcome> {
        self.doctor_update(actor, prescription_id, update, idempotency_key, AttachMode::Submission).await
    }

    /// Attaches one medicine line, keeping any lab request already implied by
    /// the status.
    pub async fn attach_medicine(&self, actor: &Actor, request: AttachMedicine) -> HmsResult<PrescriptionMedicine> {
        if request.quantity <= 0 {
            return Err(ValidationError::invalid("quantity", "must be positive").into());
        }
        let medicines = vec![MedicineLineInput { medicine_id: Some(request.medicine_id), quantity: request.quantity }];
        if valid_lines(request.prescription_id, &medicines)?.is_empty() {
            return Err(ValidationError::MissingField("medicine_id".into()).into());
        }
        let update = DoctorUpdate { notes: None, medicines, lab_tests: Vec::new() };
        let outcome = self.doctor_update(actor, request.prescription_id, update, None, AttachMode::Append).await?;
        outcome
            .medicines
            .into_iter()
            .next()
            .ok_or_else(|| ValidationError::MissingField("medicine_id".into()).into())
    }

    /// Requests one lab test, keeping any prescribed medicines implied by the
    /// status.
    pub async fn request_lab_test(&self, actor: &Actor, request: RequestLabTest) -> HmsResult<LabReport> {
        let lab_tests = vec![request.test_name];
        if valid_lab_tests(request.prescription_id, &lab_tests).is_empty() {
            return Err(ValidationError::MissingField("test_name".into()).into());
        }
        let update = DoctorUpdate { notes: None, medicines: Vec::new(), lab_tests };
        let outcome = self.doctor_update(actor, request.prescription_id, update, None, AttachMode::Append).await?;
        outcome
            .lab_reports
            .into_iter()
            .next()
            .ok_or_else(|| ValidationError::MissingField("test_name".into()).into())
    }

    async fn doctor_update(
        &self,
        actor: &Actor,
        prescription_id: RecordId,
        update: DoctorUpdate,
        idempotency_key: Option<String>,
        mode: AttachMode,
    ) -> HmsResult<DoctorUpdateOutcome> {
        let idempotency_key = non_blank(idempotency_key);
        if let Some(key) = &idempotency_key {
            if let Some(record) = self.store.get_idempotency(key).await? {
                return self.replay(prescription_id, record).await;
            }
        }

        let mut prescription = self.get_prescription(prescription_id).await?;
        let new_lines = valid_lines(prescription_id, &update.medicines)?;
        let new_tests = valid_lab_tests(prescription_id, &update.lab_tests);
        for line in &new_lines {
            let medicine = self
                .store
                .get_medicine(line.medicine_id)
                .await?
                .ok_or_else(|| HmsError::not_found("medicine", line.medicine_id))?;
            if medicine.retired {
                return Err(ValidationError::invalid(
                    "medicine_id",
                    format!("{} has been removed from the inventory", medicine.name),
                )
                .into());
            }
        }

        let (mut has_medicines, mut has_lab_tests) = (!new_lines.is_empty(), !new_tests.is_empty());
        if mode == AttachMode::Append {
            let (implied_medicines, implied_labs) = implied_attachments(prescription.status);
            has_medicines |= implied_medicines && has_lab_tests;
            has_lab_tests |= implied_labs && has_medicines;
        }
        let previous = prescription.status;
        if let Some(action) = LifecycleAction::from_attachments(has_medicines, has_lab_tests) {
            prescription.status = next_status(prescription.status, action)?;
        }

        let now = Utc::now();
        prescription.doctor_id = Some(actor.id.clone());
        if let Some(notes) = non_blank(update.notes) {
            prescription.notes = Some(notes);
        }
        prescription.updated_at = now;

        let mut lines = Vec::with_capacity(new_lines.len());
        for line in new_lines {
            lines.push(PrescriptionMedicine {
                id: self.store.next_id().await?,
                prescription_id: line.prescription_id,
                medicine_id: line.medicine_id,
                quantity_prescribed: line.quantity_prescribed,
                quantity_issued: None,
                issued_by: None,
                issued_at: None,
            });
        }
        let mut reports = Vec::with_capacity(new_tests.len());
        for test in new_tests {
            reports.push(LabReport {
                id: self.store.next_id().await?,
                prescription_id: test.prescription_id,
                test_name: test.test_name,
                status: LabReportStatus::Requested,
                result: None,
                technician_id: None,
                created_at: now,
                updated_at: None,
            });
        }

        let mut changes = ChangeSet::new();
        changes.audit.push(AuditEntry::new(
            actor,
            AuditAction::DoctorUpdated,
            EntityRef::Prescription(prescription_id),
            format!(
                "{} medicine(s), {} lab test(s); {} -> {}",
                lines.len(),
                reports.len(),
                previous,
                prescription.status
            ),
        ));
        changes.idempotency = idempotency_key.map(|key| IdempotencyRecord {
            key,
            prescription_id,
            line_ids: lines.iter().map(|l| l.id).collect(),
            lab_report_ids: reports.iter().map(|r| r.id).collect(),
        });
        changes.prescription = Some(prescription.clone());
        changes.new_lines = lines.clone();
        changes.new_lab_reports = reports.clone();

        match self.commit(changes).await? {
            CommitOutcome::Applied => {
                debug!("Doctor update on prescription {}: {} -> {}", prescription_id, previous, prescription.status);
                Ok(DoctorUpdateOutcome { prescription, medicines: lines, lab_reports: reports, replayed: false })
            }
            CommitOutcome::Replayed(record) => self.replay(prescription_id, record).await,
        }
    }

    async fn replay(&self, prescription_id: RecordId, record: IdempotencyRecord) -> HmsResult<DoctorUpdateOutcome> {
        if record.prescription_id != prescription_id {
            return Err(HmsError::Conflict(format!(
                "idempotency key '{}' was already used for prescription {}",
                record.key, record.prescription_id
            )));
        }
        info!("Replaying doctor update '{}' on prescription {}", record.key, prescription_id);
        let prescription = self.get_prescription(prescription_id).await?;
        let medicines = self
            .store
            .lines_for_prescription(prescription_id)
            .await?
            .into_iter()
            .filter(|line| record.line_ids.contains(&line.id))
            .collect();
        let lab_reports = self
            .store
            .lab_reports_for_prescription(prescription_id)
            .await?
            .into_iter()
            .filter(|report| record.lab_report_ids.contains(&report.id))
            .collect();
        Ok(DoctorUpdateOutcome { prescription, medicines, lab_reports, replayed: true })
    }

    /// Records a lab result. The parent prescription only moves when
    /// completion propagation is enabled and every one of its reports is done.
    /// Uploading a new result for a completed report replaces the old one.
    pub async fn apply_lab_result(&self, actor: &Actor, lab_report_id: RecordId, result: String) -> HmsResult<LabResultOutcome> {
        let result = result.trim().to_string();
        if result.is_empty() {
            return Err(ValidationError::MissingField("result".into()).into());
        }
        let mut report = self
            .store
            .get_lab_report(lab_report_id)
            .await?
            .ok_or_else(|| HmsError::not_found("lab report", lab_report_id))?;
        let mut prescription = self.get_prescription(report.prescription_id).await?;

        let now = Utc::now();
        report.status = LabReportStatus::Completed;
        report.result = Some(result);
        report.technician_id = Some(actor.id.clone());
        report.updated_at = Some(now);

        let mut changes = ChangeSet::new();
        changes.audit.push(
            AuditEntry::new(actor, AuditAction::LabResultRecorded, EntityRef::LabReport(report.id), report.test_name.clone())
                .with_parent(EntityRef::Prescription(prescription.id)),
        );

        let mut propagated = false;
        if self.config.propagate_lab_completion && prescription.status != PrescriptionStatus::LabTestCompleted {
            let siblings = self.store.lab_reports_for_prescription(prescription.id).await?;
            let all_done = siblings
                .iter()
                .all(|r| r.id == report.id || r.status == LabReportStatus::Completed);
            if all_done {
                match next_status(prescription.status, LifecycleAction::CompleteLabs) {
                    Ok(status) => {
                        let previous = prescription.status;
                        prescription.status = status;
                        prescription.updated_at = now;
                        changes.audit.push(AuditEntry::new(
                            actor,
                            AuditAction::LabCompletionPropagated,
                            EntityRef::Prescription(prescription.id),
                            format!("{} -> {}", previous, status),
                        ));
                        changes.prescription = Some(prescription.clone());
                        propagated = true;
                    }
                    Err(e) => debug!("Not propagating lab completion to prescription {}: {}", prescription.id, e),
                }
            }
        }
        changes.updated_lab_reports.push(report.clone());
        self.commit(changes).await?;
        Ok(LabResultOutcome { lab_report: report, prescription_status: prescription.status, propagated })
    }

    /// Dispenses medicines. Either every line is issued and every stock row
    /// decremented, or nothing changes.
    pub async fn issue_medicines(&self, actor: &Actor, prescription_id: RecordId, lines: Vec<IssueLine>) -> HmsResult<IssueOutcome> {
        if lines.is_empty() {
            return Err(ValidationError::MissingField("lines".into()).into());
        }
        let mut prescription = self.get_prescription(prescription_id).await?;
        let status = next_status(prescription.status, LifecycleAction::IssueMedication)?;

        let mut current: HashMap<RecordId, PrescriptionMedicine> = self
            .store
            .lines_for_prescription(prescription_id)
            .await?
            .into_iter()
            .map(|line| (line.id, line))
            .collect();

        let mut requested: BTreeMap<RecordId, u32> = BTreeMap::new();
        for line in &lines {
            if line.quantity == 0 {
                return Err(ValidationError::invalid("quantity", "must be positive").into());
            }
            if !current.contains_key(&line.prescription_medicine_id) {
                return Err(HmsError::not_found("prescription medicine", line.prescription_medicine_id));
            }
            let total = requested.entry(line.prescription_medicine_id).or_insert(0);
            *total = total.saturating_add(line.quantity);
        }

        let now = Utc::now();
        let mut changes = ChangeSet::new();
        let mut issued = Vec::with_capacity(requested.len());
        for (line_id, amount) in requested {
            let Some(mut line) = current.remove(&line_id) else {
                continue;
            };
            let expected_issued = line.quantity_issued;
            let cumulative = line.issued().saturating_add(amount);
            if cumulative > line.quantity_prescribed {
                return Err(ValidationError::invalid(
                    "quantity_issued",
                    format!(
                        "line {} would reach {} issued but only {} were prescribed",
                        line_id, cumulative, line.quantity_prescribed
                    ),
                )
                .into());
            }
            changes.decrement(line.medicine_id, amount);
            line.quantity_issued = Some(cumulative);
            line.issued_by = Some(actor.id.clone());
            line.issued_at = Some(now);
            issued.push(line.clone());
            changes.updated_lines.push(LineUpdate { line, expected_issued });
        }

        let previous = prescription.status;
        prescription.status = status;
        prescription.updated_at = now;
        changes.prescription = Some(prescription.clone());
        changes.audit.push(AuditEntry::new(
            actor,
            AuditAction::MedicinesIssued,
            EntityRef::Prescription(prescription_id),
            format!("{} line(s); {} -> {}", issued.len(), previous, status),
        ));
        self.commit(changes).await?;
        info!("Issued {} line(s) for prescription {}", issued.len(), prescription_id);
        Ok(IssueOutcome { prescription, medicines: issued })
    }

    /// Administrative removal of a prescription with its lines and lab reports.
    pub async fn delete_prescription(&self, actor: &Actor, id: RecordId) -> HmsResult<()> {
        let entry = AuditEntry::new(actor, AuditAction::PrescriptionDeleted, EntityRef::Prescription(id), "cascade delete");
        if !self.store.delete_prescription(id, entry.clone()).await? {
            return Err(HmsError::not_found("prescription", id));
        }
        self.audit.emit(&entry);
        Ok(())
    }
}
