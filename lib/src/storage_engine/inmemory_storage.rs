// lib/src/storage_engine/inmemory_storage.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use log::debug;
use tokio::sync::RwLock;

use models::medical::{AuditEntry, EntityRef, LabReport, Medicine, Prescription, PrescriptionMedicine, Student};
use models::{HmsError, HmsResult, RecordId, StudentId};

use crate::storage_engine::change_set::{ChangeSet, CommitOutcome, IdempotencyRecord, MedicineUpdate};
use crate::storage_engine::storage_engine::RecordStore;

#[derive(Debug, Default)]
struct Tables {
    students: BTreeMap<StudentId, Student>,
    prescriptions: BTreeMap<RecordId, Prescription>,
    lines: BTreeMap<(RecordId, RecordId), PrescriptionMedicine>,
    lab_reports: BTreeMap<RecordId, LabReport>,
    medicines: BTreeMap<RecordId, Medicine>,
    idempotency: HashMap<String, IdempotencyRecord>,
    audit: Vec<AuditEntry>,
}

/// Volatile store. Every table sits behind one lock, so a commit is atomic
/// with respect to every other operation.
#[derive(Debug)]
pub struct InMemoryStorage {
    tables: RwLock<Tables>,
    sequence: AtomicU64,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage { tables: RwLock::new(Tables::default()), sequence: AtomicU64::new(1) }
    }
}

fn check_stock(medicine: &Medicine, amount: u32) -> HmsResult<()> {
    if amount > medicine.quantity {
        return Err(HmsError::InsufficientStock {
            medicine_id: medicine.id,
            medicine: medicine.name.clone(),
            requested: amount,
            available: medicine.quantity,
        });
    }
    Ok(())
}

#[async_trait]
impl RecordStore for InMemoryStorage {
    fn get_type(&self) -> &'static str {
        "InMemory"
    }

    async fn next_id(&self) -> HmsResult<RecordId> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst))
    }

    async fn put_student(&self, student: Student) -> HmsResult<()> {
        self.tables.write().await.students.insert(student.id.clone(), student);
        Ok(())
    }

    async fn get_student(&self, id: &StudentId) -> HmsResult<Option<Student>> {
        Ok(self.tables.read().await.students.get(id).cloned())
    }

    async fn list_students(&self) -> HmsResult<Vec<Student>> {
        Ok(self.tables.read().await.students.values().cloned().collect())
    }

    async fn put_prescription(&self, prescription: Prescription) -> HmsResult<()> {
        self.tables.write().await.prescriptions.insert(prescription.id, prescription);
        Ok(())
    }

    async fn get_prescription(&self, id: RecordId) -> HmsResult<Option<Prescription>> {
        Ok(self.tables.read().await.prescriptions.get(&id).cloned())
    }

    async fn list_prescriptions(&self) -> HmsResult<Vec<Prescription>> {
        Ok(self.tables.read().await.prescriptions.values().cloned().collect())
    }

    async fn delete_prescription(&self, id: RecordId, audit: AuditEntry) -> HmsResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.prescriptions.remove(&id).is_none() {
            return Ok(false);
        }
        tables.lines.retain(|(prescription_id, _), _| *prescription_id != id);
        tables.lab_reports.retain(|_, report| report.prescription_id != id);
        tables.audit.push(audit);
        debug!("Deleted prescription {} with its lines and lab reports", id);
        Ok(true)
    }

    async fn lines_for_prescription(&self, prescription_id: RecordId) -> HmsResult<Vec<PrescriptionMedicine>> {
        let tables = self.tables.read().await;
        Ok(tables
            .lines
            .range((prescription_id, RecordId::MIN)..=(prescription_id, RecordId::MAX))
            .map(|(_, line)| line.clone())
            .collect())
    }

    async fn list_lines(&self) -> HmsResult<Vec<PrescriptionMedicine>> {
        Ok(self.tables.read().await.lines.values().cloned().collect())
    }

    async fn get_lab_report(&self, id: RecordId) -> HmsResult<Option<LabReport>> {
        Ok(self.tables.read().await.lab_reports.get(&id).cloned())
    }

    async fn lab_reports_for_prescription(&self, prescription_id: RecordId) -> HmsResult<Vec<LabReport>> {
        let tables = self.tables.read().await;
        Ok(tables.lab_reports.values().filter(|r| r.prescription_id == prescription_id).cloned().collect())
    }

    async fn list_lab_reports(&self) -> HmsResult<Vec<LabReport>> {
        Ok(self.tables.read().await.lab_reports.values().cloned().collect())
    }

    async fn put_medicine(&self, medicine: Medicine) -> HmsResult<()> {
        self.tables.write().await.medicines.insert(medicine.id, medicine);
        Ok(())
    }

    async fn get_medicine(&self, id: RecordId) -> HmsResult<Option<Medicine>> {
        Ok(self.tables.read().await.medicines.get(&id).cloned())
    }

    async fn list_medicines(&self) -> HmsResult<Vec<Medicine>> {
        Ok(self.tables.read().await.medicines.values().cloned().collect())
    }

    async fn delete_medicine(&self, id: RecordId) -> HmsResult<bool> {
        Ok(self.tables.write().await.medicines.remove(&id).is_some())
    }

    async fn decrement_stock(&self, id: RecordId, amount: u32) -> HmsResult<Medicine> {
        let mut tables = self.tables.write().await;
        let medicine = tables.medicines.get_mut(&id).ok_or_else(|| HmsError::not_found("medicine", id))?;
        check_stock(medicine, amount)?;
        medicine.quantity -= amount;
        medicine.updated_at = chrono::Utc::now();
        Ok(medicine.clone())
    }

    async fn update_medicine(&self, id: RecordId, update: MedicineUpdate) -> HmsResult<Medicine> {
        let mut tables = self.tables.write().await;
        let medicine = tables.medicines.get_mut(&id).ok_or_else(|| HmsError::not_found("medicine", id))?;
        update.apply(medicine);
        Ok(medicine.clone())
    }

    async fn commit(&self, changes: ChangeSet) -> HmsResult<CommitOutcome> {
        let mut tables = self.tables.write().await;

        if let Some(record) = &changes.idempotency {
            if let Some(existing) = tables.idempotency.get(&record.key) {
                debug!("Idempotency key {} already committed, replaying", record.key);
                return Ok(CommitOutcome::Replayed(existing.clone()));
            }
        }

        // Validate everything before the first write.
        if let Some(prescription) = &changes.prescription {
            if !changes.new_prescription && !tables.prescriptions.contains_key(&prescription.id) {
                return Err(HmsError::not_found("prescription", prescription.id));
            }
        }
        for (medicine_id, amount) in &changes.stock_decrements {
            let medicine = tables
                .medicines
                .get(medicine_id)
                .ok_or_else(|| HmsError::not_found("medicine", medicine_id))?;
            check_stock(medicine, *amount)?;
        }
        for update in &changes.updated_lines {
            let key = (update.line.prescription_id, update.line.id);
            let current = tables.lines.get(&key).ok_or_else(|| HmsError::not_found("prescription medicine", update.line.id))?;
            if current.quantity_issued != update.expected_issued {
                return Err(HmsError::Conflict(format!(
                    "prescription medicine {} was issued concurrently",
                    update.line.id
                )));
            }
        }
        for report in &changes.updated_lab_reports {
            if !tables.lab_reports.contains_key(&report.id) {
                return Err(HmsError::not_found("lab report", report.id));
            }
        }

        let now = chrono::Utc::now();
        for (medicine_id, amount) in &changes.stock_decrements {
            if let Some(medicine) = tables.medicines.get_mut(medicine_id) {
                medicine.quantity -= amount;
                medicine.updated_at = now;
            }
        }
        if let Some(prescription) = changes.prescription {
            tables.prescriptions.insert(prescription.id, prescription);
        }
        for line in changes.new_lines {
            tables.lines.insert((line.prescription_id, line.id), line);
        }
        for update in changes.updated_lines {
            tables.lines.insert((update.line.prescription_id, update.line.id), update.line);
        }
        for report in changes.new_lab_reports.into_iter().chain(changes.updated_lab_reports) {
            tables.lab_reports.insert(report.id, report);
        }
        if let Some(record) = changes.idempotency {
            tables.idempotency.insert(record.key.clone(), record);
        }
        tables.audit.extend(changes.audit);
        Ok(CommitOutcome::Applied)
    }

    async fn get_idempotency(&self, key: &str) -> HmsResult<Option<IdempotencyRecord>> {
        Ok(self.tables.read().await.idempotency.get(key).cloned())
    }

    async fn append_audit(&self, entry: AuditEntry) -> HmsResult<()> {
        self.tables.write().await.audit.push(entry);
        Ok(())
    }

    async fn audit_for(&self, entity: &EntityRef) -> HmsResult<Vec<AuditEntry>> {
        let tables = self.tables.read().await;
        Ok(tables.audit.iter().filter(|e| e.concerns(entity)).cloned().collect())
    }

    async fn flush(&self) -> HmsResult<()> {
        Ok(())
    }
}
