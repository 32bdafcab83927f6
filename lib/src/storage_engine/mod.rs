// lib/src/storage_engine/mod.rs

pub mod change_set;
pub mod inmemory_storage;
pub mod sled_storage;
pub mod storage_engine;
pub mod storage_utils;

pub use change_set::{ChangeSet, CommitOutcome, IdempotencyRecord, LineUpdate, MedicineUpdate};
pub use inmemory_storage::InMemoryStorage;
pub use sled_storage::{open_sled_db, SledStorage};
pub use storage_engine::RecordStore;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::config::{StorageConfig, StorageEngineType};

/// Creates a storage engine instance based on the provided configuration.
///
/// Sled is the default; the in-memory engine is meant for tests and demos.
pub fn create_storage(config: &StorageConfig) -> Result<Arc<dyn RecordStore>> {
    info!("Creating {} storage engine", config.storage_engine_type);
    match config.storage_engine_type {
        StorageEngineType::Sled => {
            let storage = SledStorage::new(config)
                .with_context(|| format!("Failed to open sled storage at {:?}", config.data_directory))?;
            Ok(Arc::new(storage) as Arc<dyn RecordStore>)
        }
        StorageEngineType::InMemory => Ok(Arc::new(InMemoryStorage::new()) as Arc<dyn RecordStore>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use models::medical::*;
    use models::{HmsError, StudentId};

    fn medicine(id: u64, quantity: u32) -> Medicine {
        let now = Utc::now();
        Medicine {
            id,
            name: format!("Medicine {}", id),
            category: MedicineCategory::Tablet,
            quantity,
            expiry_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            retired: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn prescription(id: u64) -> Prescription {
        let now = Utc::now();
        Prescription {
            id,
            student_id: StudentId::new("R200137").unwrap(),
            nurse_id: "nurse-1".into(),
            doctor_id: None,
            chief_complaint: "Fever".into(),
            notes: None,
            vitals: Vitals::default(),
            status: PrescriptionStatus::InitiatedByNurse,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(id: u64, prescription_id: u64, medicine_id: u64, quantity: u32) -> PrescriptionMedicine {
        PrescriptionMedicine {
            id,
            prescription_id,
            medicine_id,
            quantity_prescribed: quantity,
            quantity_issued: None,
            issued_by: None,
            issued_at: None,
        }
    }

    fn audit(action: AuditAction, entity: EntityRef) -> AuditEntry {
        AuditEntry::new(&Actor::new("admin", Role::Admin), action, entity, "test")
    }

    async fn exercise_decrement(store: Arc<dyn RecordStore>) {
        store.put_medicine(medicine(1, 5)).await.unwrap();
        let after = store.decrement_stock(1, 3).await.unwrap();
        assert_eq!(after.quantity, 2);
        match store.decrement_stock(1, 3).await {
            Err(HmsError::InsufficientStock { requested, available, .. }) => {
                assert_eq!((requested, available), (3, 2));
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
        assert_eq!(store.get_medicine(1).await.unwrap().unwrap().quantity, 2);
        assert!(matches!(store.decrement_stock(99, 1).await, Err(HmsError::NotFound { .. })));
    }

    async fn exercise_commit_is_all_or_nothing(store: Arc<dyn RecordStore>) {
        store.put_medicine(medicine(1, 10)).await.unwrap();
        store.put_medicine(medicine(2, 1)).await.unwrap();

        let mut changes = ChangeSet::new();
        changes.prescription = Some(prescription(7));
        changes.new_prescription = true;
        changes.new_lines.push(line(8, 7, 1, 4));
        changes.decrement(1, 4);
        changes.decrement(2, 2);
        let err = store.commit(changes).await.unwrap_err();
        assert!(matches!(err, HmsError::InsufficientStock { medicine_id: 2, .. }));

        assert!(store.get_prescription(7).await.unwrap().is_none());
        assert!(store.lines_for_prescription(7).await.unwrap().is_empty());
        assert_eq!(store.get_medicine(1).await.unwrap().unwrap().quantity, 10);
    }

    async fn exercise_idempotent_replay(store: Arc<dyn RecordStore>) {
        store.put_prescription(prescription(3)).await.unwrap();
        let record = IdempotencyRecord {
            key: "retry-1".into(),
            prescription_id: 3,
            line_ids: vec![],
            lab_report_ids: vec![4],
        };
        let report = LabReport {
            id: 4,
            prescription_id: 3,
            test_name: "CBC".into(),
            status: LabReportStatus::Requested,
            result: None,
            technician_id: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        let mut first = ChangeSet::new();
        first.new_lab_reports.push(report.clone());
        first.idempotency = Some(record.clone());
        assert_eq!(store.commit(first).await.unwrap(), CommitOutcome::Applied);

        let mut second = ChangeSet::new();
        second.new_lab_reports.push(LabReport { id: 5, ..report });
        second.idempotency = Some(IdempotencyRecord { lab_report_ids: vec![5], ..record.clone() });
        assert_eq!(store.commit(second).await.unwrap(), CommitOutcome::Replayed(record));
        assert_eq!(store.lab_reports_for_prescription(3).await.unwrap().len(), 1);
    }

    async fn exercise_guarded_line_update(store: Arc<dyn RecordStore>) {
        store.put_medicine(medicine(1, 10)).await.unwrap();
        let mut seed = ChangeSet::new();
        seed.prescription = Some(prescription(2));
        seed.new_prescription = true;
        seed.new_lines.push(line(3, 2, 1, 4));
        store.commit(seed).await.unwrap();

        let issued = PrescriptionMedicine { quantity_issued: Some(4), ..line(3, 2, 1, 4) };
        let mut stale = ChangeSet::new();
        stale.updated_lines.push(LineUpdate { line: issued.clone(), expected_issued: Some(1) });
        stale.decrement(1, 4);
        assert!(matches!(store.commit(stale).await, Err(HmsError::Conflict(_))));
        assert_eq!(store.get_medicine(1).await.unwrap().unwrap().quantity, 10);

        let mut fresh = ChangeSet::new();
        fresh.updated_lines.push(LineUpdate { line: issued, expected_issued: None });
        fresh.decrement(1, 4);
        store.commit(fresh).await.unwrap();
        assert_eq!(store.lines_for_prescription(2).await.unwrap()[0].quantity_issued, Some(4));
        assert_eq!(store.get_medicine(1).await.unwrap().unwrap().quantity, 6);
    }

    async fn exercise_cascade_delete(store: Arc<dyn RecordStore>) {
        let mut seed = ChangeSet::new();
        seed.prescription = Some(prescription(1));
        seed.new_prescription = true;
        seed.new_lines.push(line(2, 1, 40, 1));
        seed.new_lines.push(line(3, 1, 41, 2));
        store.commit(seed).await.unwrap();
        let mut other = ChangeSet::new();
        other.prescription = Some(prescription(10));
        other.new_prescription = true;
        other.new_lines.push(line(11, 10, 40, 1));
        store.commit(other).await.unwrap();

        let entry = audit(AuditAction::PrescriptionDeleted, EntityRef::Prescription(1));
        assert!(store.delete_prescription(1, entry.clone()).await.unwrap());
        assert!(!store.delete_prescription(1, entry).await.unwrap());
        assert!(store.lines_for_prescription(1).await.unwrap().is_empty());
        assert_eq!(store.list_lines().await.unwrap().len(), 1);
        assert_eq!(store.audit_for(&EntityRef::Prescription(1)).await.unwrap().len(), 1);
    }

    async fn exercise_commit_after_delete(store: Arc<dyn RecordStore>) {
        let mut seed = ChangeSet::new();
        seed.prescription = Some(prescription(5));
        seed.new_prescription = true;
        store.commit(seed).await.unwrap();
        let entry = audit(AuditAction::PrescriptionDeleted, EntityRef::Prescription(5));
        assert!(store.delete_prescription(5, entry).await.unwrap());

        let mut late = ChangeSet::new();
        late.prescription = Some(Prescription { doctor_id: Some("doctor-1".into()), ..prescription(5) });
        late.new_lines.push(line(6, 5, 1, 1));
        late.audit.push(audit(AuditAction::DoctorUpdated, EntityRef::Prescription(5)));
        assert!(matches!(store.commit(late).await, Err(HmsError::NotFound { .. })));
        assert!(store.get_prescription(5).await.unwrap().is_none());
        assert!(store.lines_for_prescription(5).await.unwrap().is_empty());
        assert_eq!(store.audit_for(&EntityRef::Prescription(5)).await.unwrap().len(), 1);
    }

    async fn exercise_update_medicine(store: Arc<dyn RecordStore>) {
        store.put_medicine(medicine(1, 20)).await.unwrap();
        let stale = store.get_medicine(1).await.unwrap().unwrap();
        store.decrement_stock(1, 7).await.unwrap();

        let rename = MedicineUpdate { name: Some(format!("{} forte", stale.name)), ..Default::default() };
        let updated = store.update_medicine(1, rename).await.unwrap();
        assert_eq!(updated.name, "Medicine 1 forte");
        assert_eq!(updated.quantity, 13);

        let retire = MedicineUpdate { retired: Some(true), ..Default::default() };
        assert!(store.update_medicine(1, retire.clone()).await.unwrap().retired);
        assert_eq!(store.get_medicine(1).await.unwrap().unwrap().quantity, 13);
        assert!(matches!(store.update_medicine(99, retire).await, Err(HmsError::NotFound { .. })));
    }

    async fn exercise_all(make: impl Fn() -> Arc<dyn RecordStore>) {
        exercise_decrement(make()).await;
        exercise_commit_is_all_or_nothing(make()).await;
        exercise_idempotent_replay(make()).await;
        exercise_guarded_line_update(make()).await;
        exercise_cascade_delete(make()).await;
        exercise_commit_after_delete(make()).await;
        exercise_update_medicine(make()).await;
    }

    #[tokio::test]
    async fn in_memory_engine_behaves() {
        exercise_all(|| create_storage(&StorageConfig::in_memory()).unwrap()).await;
    }

    #[tokio::test]
    async fn sled_engine_behaves() {
        let dirs: std::sync::Mutex<Vec<tempfile::TempDir>> = std::sync::Mutex::new(Vec::new());
        exercise_all(|| {
            let dir = tempfile::tempdir().unwrap();
            let config = StorageConfig {
                storage_engine_type: StorageEngineType::Sled,
                data_directory: dir.path().join("db"),
                ..StorageConfig::default()
            };
            dirs.lock().unwrap().push(dir);
            create_storage(&config).unwrap()
        })
        .await;
    }

    #[tokio::test]
    async fn concurrent_decrements_never_go_negative() {
        let store = create_storage(&StorageConfig::in_memory()).unwrap();
        store.put_medicine(medicine(1, 50)).await.unwrap();
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.decrement_stock(1, 3).await.is_ok() }));
        }
        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 16);
        assert_eq!(store.get_medicine(1).await.unwrap().unwrap().quantity, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn renames_racing_decrements_keep_every_unit() {
        let store = create_storage(&StorageConfig::in_memory()).unwrap();
        store.put_medicine(medicine(1, 40)).await.unwrap();
        let mut handles = Vec::new();
        for i in 0..10 {
            let decrementer = store.clone();
            handles.push(tokio::spawn(async move {
                decrementer.decrement_stock(1, 3).await.unwrap();
            }));
            let renamer = store.clone();
            handles.push(tokio::spawn(async move {
                let update = MedicineUpdate { name: Some(format!("Batch {}", i)), ..Default::default() };
                renamer.update_medicine(1, update).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.get_medicine(1).await.unwrap().unwrap().quantity, 10);
    }
}
