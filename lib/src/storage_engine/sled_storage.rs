// lib/src/storage_engine/sled_storage.rs

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, error, info};
use serde::de::DeserializeOwned;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{IVec, Transactional, Tree};

use models::medical::{AuditEntry, EntityRef, LabReport, Medicine, Prescription, PrescriptionMedicine, Student};
use models::{HmsError, HmsResult, RecordId, StudentId};

use crate::config::StorageConfig;
use crate::storage_engine::change_set::{ChangeSet, CommitOutcome, IdempotencyRecord, MedicineUpdate};
use crate::storage_engine::storage_engine::RecordStore;
use crate::storage_engine::storage_utils::{deserialize_record, id_key, line_key, serialize_record};

const STUDENTS: &str = "students";
const PRESCRIPTIONS: &str = "prescriptions";
const LINES: &str = "prescription_medicines";
const LAB_REPORTS: &str = "lab_reports";
const MEDICINES: &str = "medicines";
const IDEMPOTENCY: &str = "idempotency";
const AUDIT: &str = "audit";

fn store_err(e: sled::Error) -> HmsError {
    HmsError::StoreUnavailable(e.to_string())
}

fn tx_err(e: TransactionError<HmsError>) -> HmsError {
    match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => store_err(e),
    }
}

fn abort(e: HmsError) -> ConflictableTransactionError<HmsError> {
    ConflictableTransactionError::Abort(e)
}

/// Opens (creating if needed) the sled database under `path`.
pub fn open_sled_db(path: &Path, cache_capacity: u64) -> HmsResult<sled::Db> {
    std::fs::create_dir_all(path).map_err(|e| {
        error!("Failed to create database directory at {:?}: {}", path, e);
        HmsError::StoreUnavailable(format!("Failed to create database directory at {:?}: {}", path, e))
    })?;
    info!("Opening Sled database at {:?}", path);
    sled::Config::new()
        .path(path)
        .cache_capacity(cache_capacity)
        .open()
        .map_err(|e| {
            error!("Failed to open Sled database at {:?}: {}", path, e);
            HmsError::StoreUnavailable(format!("Failed to open Sled database at {:?}: {}", path, e))
        })
}

/// Durable store. One sled tree per table; multi-record writes run in a
/// multi-tree transaction.
#[derive(Debug, Clone)]
pub struct SledStorage {
    db: sled::Db,
    path: PathBuf,
    students: Tree,
    prescriptions: Tree,
    lines: Tree,
    lab_reports: Tree,
    medicines: Tree,
    idempotency: Tree,
    audit: Tree,
}

impl SledStorage {
    pub fn new(config: &StorageConfig) -> HmsResult<Self> {
        let db = open_sled_db(&config.data_directory, config.cache_capacity)?;
        Self::with_db(db, config.data_directory.clone())
    }

    pub fn with_db(db: sled::Db, path: PathBuf) -> HmsResult<Self> {
        let open = |name: &str| db.open_tree(name).map_err(store_err);
        let storage = SledStorage {
            students: open(STUDENTS)?,
            prescriptions: open(PRESCRIPTIONS)?,
            lines: open(LINES)?,
            lab_reports: open(LAB_REPORTS)?,
            medicines: open(MEDICINES)?,
            idempotency: open(IDEMPOTENCY)?,
            audit: open(AUDIT)?,
            db,
            path,
        };
        info!("Sled storage ready at {:?}", storage.path);
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fetch<T: DeserializeOwned>(tree: &Tree, key: &[u8]) -> HmsResult<Option<T>> {
        match tree.get(key).map_err(store_err)? {
            Some(bytes) => Ok(Some(deserialize_record(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(tree: &Tree) -> HmsResult<Vec<T>> {
        tree.iter()
            .values()
            .map(|value| value.map_err(store_err).and_then(|bytes| deserialize_record(&bytes)))
            .collect()
    }

    fn audit_keys(&self, count: usize) -> HmsResult<Vec<[u8; 8]>> {
        (0..count).map(|_| self.db.generate_id().map(id_key).map_err(store_err)).collect()
    }
}

#[async_trait]
impl RecordStore for SledStorage {
    fn get_type(&self) -> &'static str {
        "Sled"
    }

    async fn next_id(&self) -> HmsResult<RecordId> {
        self.db.generate_id().map(|id| id + 1).map_err(store_err)
    }

    async fn put_student(&self, student: Student) -> HmsResult<()> {
        let bytes = serialize_record(&student)?;
        self.students.insert(student.id.as_str().as_bytes(), bytes).map_err(store_err)?;
        Ok(())
    }

    async fn get_student(&self, id: &StudentId) -> HmsResult<Option<Student>> {
        Self::fetch(&self.students, id.as_str().as_bytes())
    }

    async fn list_students(&self) -> HmsResult<Vec<Student>> {
        Self::scan(&self.students)
    }

    async fn put_prescription(&self, prescription: Prescription) -> HmsResult<()> {
        let bytes = serialize_record(&prescription)?;
        self.prescriptions.insert(&id_key(prescription.id)[..], bytes).map_err(store_err)?;
        Ok(())
    }

    async fn get_prescription(&self, id: RecordId) -> HmsResult<Option<Prescription>> {
        Self::fetch(&self.prescriptions, &id_key(id))
    }

    async fn list_prescriptions(&self) -> HmsResult<Vec<Prescription>> {
        Self::scan(&self.prescriptions)
    }

    async fn delete_prescription(&self, id: RecordId, audit: AuditEntry) -> HmsResult<bool> {
        let prescription_key = id_key(id);
        let line_keys: Vec<IVec> = self
            .lines
            .scan_prefix(prescription_key)
            .keys()
            .collect::<Result<_, _>>()
            .map_err(store_err)?;
        let report_keys: Vec<[u8; 8]> = self
            .lab_reports_for_prescription(id)
            .await?
            .iter()
            .map(|report| id_key(report.id))
            .collect();
        let audit_key = self.audit_keys(1)?.remove(0);
        let audit_bytes = serialize_record(&audit)?;

        let removed = (&self.prescriptions, &self.lines, &self.lab_reports, &self.audit)
            .transaction(|(tp, tl, tr, ta)| {
                if tp.remove(&prescription_key[..])?.is_none() {
                    return Ok(false);
                }
                for key in &line_keys {
                    tl.remove(&key[..])?;
                }
                for key in &report_keys {
                    tr.remove(&key[..])?;
                }
                ta.insert(&audit_key[..], audit_bytes.as_slice())?;
                Ok(true)
            })
            .map_err(tx_err)?;
        if removed {
            debug!("Deleted prescription {} with {} line(s) and {} lab report(s)", id, line_keys.len(), report_keys.len());
        }
        Ok(removed)
    }

    async fn lines_for_prescription(&self, prescription_id: RecordId) -> HmsResult<Vec<PrescriptionMedicine>> {
        self.lines
            .scan_prefix(id_key(prescription_id))
            .values()
            .map(|value| value.map_err(store_err).and_then(|bytes| deserialize_record(&bytes)))
            .collect()
    }

    async fn list_lines(&self) -> HmsResult<Vec<PrescriptionMedicine>> {
        Self::scan(&self.lines)
    }

    async fn get_lab_report(&self, id: RecordId) -> HmsResult<Option<LabReport>> {
        Self::fetch(&self.lab_reports, &id_key(id))
    }

    async fn lab_reports_for_prescription(&self, prescription_id: RecordId) -> HmsResult<Vec<LabReport>> {
        let reports: Vec<LabReport> = Self::scan(&self.lab_reports)?;
        Ok(reports.into_iter().filter(|r| r.prescription_id == prescription_id).collect())
    }

    async fn list_lab_reports(&self) -> HmsResult<Vec<LabReport>> {
        Self::scan(&self.lab_reports)
    }

    async fn put_medicine(&self, medicine: Medicine) -> HmsResult<()> {
        let bytes = serialize_record(&medicine)?;
        self.medicines.insert(&id_key(medicine.id)[..], bytes).map_err(store_err)?;
        Ok(())
    }

    async fn get_medicine(&self, id: RecordId) -> HmsResult<Option<Medicine>> {
        Self::fetch(&self.medicines, &id_key(id))
    }

    async fn list_medicines(&self) -> HmsResult<Vec<Medicine>> {
        Self::scan(&self.medicines)
    }

    async fn delete_medicine(&self, id: RecordId) -> HmsResult<bool> {
        Ok(self.medicines.remove(&id_key(id)[..]).map_err(store_err)?.is_some())
    }

    async fn decrement_stock(&self, id: RecordId, amount: u32) -> HmsResult<Medicine> {
        let key = id_key(id);
        self.medicines
            .transaction(|tm| {
                let bytes = tm.get(&key[..])?.ok_or_else(|| abort(HmsError::not_found("medicine", id)))?;
                let mut medicine: Medicine = deserialize_record(&bytes).map_err(abort)?;
                if amount > medicine.quantity {
                    return Err(abort(HmsError::InsufficientStock {
                        medicine_id: id,
                        medicine: medicine.name.clone(),
                        requested: amount,
                        available: medicine.quantity,
                    }));
                }
                medicine.quantity -= amount;
                medicine.updated_at = chrono::Utc::now();
                tm.insert(&key[..], serialize_record(&medicine).map_err(abort)?)?;
                Ok(medicine)
            })
            .map_err(tx_err)
    }

    async fn update_medicine(&self, id: RecordId, update: MedicineUpdate) -> HmsResult<Medicine> {
        let key = id_key(id);
        self.medicines
            .transaction(|tm| {
                let bytes = tm.get(&key[..])?.ok_or_else(|| abort(HmsError::not_found("medicine", id)))?;
                let mut medicine: Medicine = deserialize_record(&bytes).map_err(abort)?;
                update.apply(&mut medicine);
                tm.insert(&key[..], serialize_record(&medicine).map_err(abort)?)?;
                Ok(medicine)
            })
            .map_err(tx_err)
    }

    async fn commit(&self, changes: ChangeSet) -> HmsResult<CommitOutcome> {
        let prescription = match &changes.prescription {
            Some(p) => Some((id_key(p.id), p.id, serialize_record(p)?)),
            None => None,
        };
        let new_prescription = changes.new_prescription;
        let new_lines = changes
            .new_lines
            .iter()
            .map(|line| Ok((line_key(line.prescription_id, line.id), serialize_record(line)?)))
            .collect::<HmsResult<Vec<_>>>()?;
        let updated_lines = changes
            .updated_lines
            .iter()
            .map(|u| Ok((line_key(u.line.prescription_id, u.line.id), u, serialize_record(&u.line)?)))
            .collect::<HmsResult<Vec<_>>>()?;
        let lab_reports = changes
            .new_lab_reports
            .iter()
            .map(|r| Ok((id_key(r.id), None::<RecordId>, serialize_record(r)?)))
            .chain(changes.updated_lab_reports.iter().map(|r| Ok((id_key(r.id), Some(r.id), serialize_record(r)?))))
            .collect::<HmsResult<Vec<_>>>()?;
        let idempotency = match &changes.idempotency {
            Some(record) => Some((record.key.clone(), serialize_record(record)?)),
            None => None,
        };
        let audit = self
            .audit_keys(changes.audit.len())?
            .into_iter()
            .zip(changes.audit.iter())
            .map(|(key, entry)| Ok((key, serialize_record(entry)?)))
            .collect::<HmsResult<Vec<_>>>()?;

        (&self.prescriptions, &self.lines, &self.lab_reports, &self.medicines, &self.idempotency, &self.audit)
            .transaction(|(tp, tl, tr, tm, ti, ta)| {
                if let Some((key, _)) = &idempotency {
                    if let Some(bytes) = ti.get(key.as_bytes())? {
                        let existing: IdempotencyRecord = deserialize_record(&bytes).map_err(abort)?;
                        return Ok(CommitOutcome::Replayed(existing));
                    }
                }

                if let Some((key, id, _)) = &prescription {
                    if !new_prescription && tp.get(&key[..])?.is_none() {
                        return Err(abort(HmsError::not_found("prescription", id)));
                    }
                }

                let now = chrono::Utc::now();
                for (medicine_id, amount) in &changes.stock_decrements {
                    let key = id_key(*medicine_id);
                    let bytes = tm
                        .get(&key[..])?
                        .ok_or_else(|| abort(HmsError::not_found("medicine", medicine_id)))?;
                    let mut medicine: Medicine = deserialize_record(&bytes).map_err(abort)?;
                    if *amount > medicine.quantity {
                        return Err(abort(HmsError::InsufficientStock {
                            medicine_id: *medicine_id,
                            medicine: medicine.name.clone(),
                            requested: *amount,
                            available: medicine.quantity,
                        }));
                    }
                    medicine.quantity -= amount;
                    medicine.updated_at = now;
                    tm.insert(&key[..], serialize_record(&medicine).map_err(abort)?)?;
                }

                for (key, update, bytes) in &updated_lines {
                    let current = tl
                        .get(&key[..])?
                        .ok_or_else(|| abort(HmsError::not_found("prescription medicine", update.line.id)))?;
                    let current: PrescriptionMedicine = deserialize_record(&current).map_err(abort)?;
                    if current.quantity_issued != update.expected_issued {
                        return Err(abort(HmsError::Conflict(format!(
                            "prescription medicine {} was issued concurrently",
                            update.line.id
                        ))));
                    }
                    tl.insert(&key[..], bytes.as_slice())?;
                }
                for (key, bytes) in &new_lines {
                    tl.insert(&key[..], bytes.as_slice())?;
                }

                for (key, updated_id, bytes) in &lab_reports {
                    let previous = tr.insert(&key[..], bytes.as_slice())?;
                    if let (Some(id), None) = (updated_id, previous) {
                        return Err(abort(HmsError::not_found("lab report", id)));
                    }
                }

                if let Some((key, _, bytes)) = &prescription {
                    tp.insert(&key[..], bytes.as_slice())?;
                }
                if let Some((key, bytes)) = &idempotency {
                    ti.insert(key.as_bytes(), bytes.as_slice())?;
                }
                for (key, bytes) in &audit {
                    ta.insert(&key[..], bytes.as_slice())?;
                }
                Ok(CommitOutcome::Applied)
            })
            .map_err(tx_err)
    }

    async fn get_idempotency(&self, key: &str) -> HmsResult<Option<IdempotencyRecord>> {
        Self::fetch(&self.idempotency, key.as_bytes())
    }

    async fn append_audit(&self, entry: AuditEntry) -> HmsResult<()> {
        let key = self.audit_keys(1)?.remove(0);
        self.audit.insert(&key[..], serialize_record(&entry)?).map_err(store_err)?;
        Ok(())
    }

    async fn audit_for(&self, entity: &EntityRef) -> HmsResult<Vec<AuditEntry>> {
        let entries: Vec<AuditEntry> = Self::scan(&self.audit)?;
        Ok(entries.into_iter().filter(|e| e.concerns(entity)).collect())
    }

    async fn flush(&self) -> HmsResult<()> {
        self.db.flush_async().await.map_err(store_err)?;
        Ok(())
    }
}
