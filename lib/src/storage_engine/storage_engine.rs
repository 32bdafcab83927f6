// lib/src/storage_engine/storage_engine.rs

use async_trait::async_trait;

use models::medical::{AuditEntry, EntityRef, LabReport, Medicine, Prescription, PrescriptionMedicine, Student};
use models::{HmsResult, RecordId, StudentId};

use crate::storage_engine::change_set::{ChangeSet, CommitOutcome, IdempotencyRecord, MedicineUpdate};

/// Durable home of every record the lifecycle service owns.
///
/// Single-record writes are plain upserts. Anything that touches more than
/// one record in a lifecycle step goes through [`RecordStore::commit`], which
/// must be atomic.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    fn get_type(&self) -> &'static str;

    /// Allocates a fresh record id. Ids are unique across all tables.
    async fn next_id(&self) -> HmsResult<RecordId>;

    async fn put_student(&self, student: Student) -> HmsResult<()>;
    async fn get_student(&self, id: &StudentId) -> HmsResult<Option<Student>>;
    async fn list_students(&self) -> HmsResult<Vec<Student>>;

    async fn put_prescription(&self, prescription: Prescription) -> HmsResult<()>;
    async fn get_prescription(&self, id: RecordId) -> HmsResult<Option<Prescription>>;
    async fn list_prescriptions(&self) -> HmsResult<Vec<Prescription>>;
    /// Removes the prescription with its lines and lab reports. Returns false
    /// when there was nothing to delete.
    async fn delete_prescription(&self, id: RecordId, audit: AuditEntry) -> HmsResult<bool>;

    async fn lines_for_prescription(&self, prescription_id: RecordId) -> HmsResult<Vec<PrescriptionMedicine>>;
    async fn list_lines(&self) -> HmsResult<Vec<PrescriptionMedicine>>;

    async fn get_lab_report(&self, id: RecordId) -> HmsResult<Option<LabReport>>;
    async fn lab_reports_for_prescription(&self, prescription_id: RecordId) -> HmsResult<Vec<LabReport>>;
    async fn list_lab_reports(&self) -> HmsResult<Vec<LabReport>>;

    async fn put_medicine(&self, medicine: Medicine) -> HmsResult<()>;
    async fn get_medicine(&self, id: RecordId) -> HmsResult<Option<Medicine>>;
    async fn list_medicines(&self) -> HmsResult<Vec<Medicine>>;
    async fn delete_medicine(&self, id: RecordId) -> HmsResult<bool>;
    /// Compare-and-subtract on one medicine row. Fails with
    /// `InsufficientStock` and leaves the row untouched when `amount` exceeds
    /// the quantity on hand.
    async fn decrement_stock(&self, id: RecordId, amount: u32) -> HmsResult<Medicine>;
    /// Applies `update` to the current row in one step, so a decrement that
    /// lands between a caller's read and this write is kept.
    async fn update_medicine(&self, id: RecordId, update: MedicineUpdate) -> HmsResult<Medicine>;

    /// Applies a change set atomically. When it carries an idempotency key
    /// that was already committed, nothing is written and the earlier record
    /// is returned.
    async fn commit(&self, changes: ChangeSet) -> HmsResult<CommitOutcome>;
    async fn get_idempotency(&self, key: &str) -> HmsResult<Option<IdempotencyRecord>>;

    async fn append_audit(&self, entry: AuditEntry) -> HmsResult<()>;
    /// Entries about `entity` or whose parent is `entity`, oldest first.
    async fn audit_for(&self, entity: &EntityRef) -> HmsResult<Vec<AuditEntry>>;

    async fn flush(&self) -> HmsResult<()>;
}
