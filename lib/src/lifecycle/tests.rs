// lib/src/lifecycle/tests.rs

use std::sync::Arc;

use models::medical::*;
use models::{HmsError, ValidationError};

use crate::audit::AuditTrail;
use crate::config::{InventoryConfig, LifecycleConfig};
use crate::inventory::InventoryLedger;
use crate::lifecycle::LifecycleEngine;
use crate::storage_engine::{InMemoryStorage, RecordStore};

struct Fixture {
    store: Arc<dyn RecordStore>,
    engine: LifecycleEngine,
    ledger: InventoryLedger,
}

fn fixture_with(config: LifecycleConfig) -> Fixture {
    let store: Arc<dyn RecordStore> = Arc::new(InMemoryStorage::new());
    let audit = AuditTrail::new(store.clone());
    Fixture {
        engine: LifecycleEngine::new(store.clone(), audit.clone(), config),
        ledger: InventoryLedger::new(store.clone(), audit, InventoryConfig::default()),
        store,
    }
}

fn fixture() -> Fixture {
    fixture_with(LifecycleConfig::default())
}

fn nurse() -> Actor {
    Actor::new("nurse-1", Role::Nurse)
}

fn doctor() -> Actor {
    Actor::new("doctor-1", Role::Doctor)
}

fn tech() -> Actor {
    Actor::new("tech-1", Role::LabTechnician)
}

fn pharmacist() -> Actor {
    Actor::new("pharm-1", Role::Pharmacist)
}

fn intake() -> NewPrescription {
    NewPrescription {
        student_id: "r200137".into(),
        chief_complaint: "Fever and headache".into(),
        notes: None,
        vitals: Vitals {
            temperature: Some("101.2".into()),
            blood_pressure: Some("118/76".into()),
            weight: Some("58".into()),
        },
    }
}

async fn stock(f: &Fixture, name: &str, quantity: i64) -> Medicine {
    f.ledger
        .add_medicine(
            &pharmacist(),
            MedicineInput {
                name: name.into(),
                category: "Tablet".into(),
                quantity,
                expiry_date: "2030-01-01".into(),
            },
        )
        .await
        .unwrap()
}

fn med_line(medicine_id: u64, quantity: i64) -> MedicineLineInput {
    MedicineLineInput { medicine_id: Some(medicine_id), quantity }
}

#[tokio::test]
async fn intake_starts_without_doctor() {
    let f = fixture();
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    assert_eq!(p.status, PrescriptionStatus::InitiatedByNurse);
    assert_eq!(p.student_id.as_str(), "R200137");
    assert_eq!(p.nurse_id, "nurse-1");
    assert!(p.doctor_id.is_none());
    assert!(p.doctor_invariant_holds());
}

#[tokio::test]
async fn intake_validates_fields() {
    let f = fixture();
    let bad_id = NewPrescription { student_id: "X1".into(), ..intake() };
    assert!(matches!(
        f.engine.create_prescription(&nurse(), bad_id).await,
        Err(HmsError::Validation(ValidationError::InvalidIdentifier(_)))
    ));
    let blank = NewPrescription { chief_complaint: "  ".into(), ..intake() };
    match f.engine.create_prescription(&nurse(), blank).await {
        Err(HmsError::Validation(e)) => assert_eq!(e.field(), "chief_complaint"),
        other => panic!("unexpected {:?}", other),
    }
    let hot = NewPrescription {
        vitals: Vitals { temperature: Some("130".into()), ..Vitals::default() },
        ..intake()
    };
    assert!(f.engine.create_prescription(&nurse(), hot).await.is_err());
    assert!(f.store.list_prescriptions().await.unwrap().is_empty());
}

#[tokio::test]
async fn medicines_and_lab_test_attach_both() {
    let f = fixture();
    let a = stock(&f, "Paracetamol", 100).await;
    let b = stock(&f, "Cetirizine", 100).await;
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();

    let update = DoctorUpdate {
        notes: Some("Viral fever suspected".into()),
        medicines: vec![med_line(a.id, 6), med_line(b.id, 3)],
        lab_tests: vec!["Complete Blood Count".into()],
    };
    let outcome = f.engine.apply_doctor_update(&doctor(), p.id, update, None).await.unwrap();
    assert_eq!(outcome.prescription.status, PrescriptionStatus::PrescribedAndLabTestRequested);
    assert_eq!(outcome.prescription.doctor_id.as_deref(), Some("doctor-1"));
    assert!(outcome.prescription.doctor_invariant_holds());
    assert_eq!(f.store.lines_for_prescription(p.id).await.unwrap().len(), 2);
    let reports = f.store.lab_reports_for_prescription(p.id).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, LabReportStatus::Requested);
}

#[tokio::test]
async fn blank_lab_tests_only_leave_status_unchanged() {
    let f = fixture();
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    let update = DoctorUpdate {
        notes: Some("Rest advised".into()),
        medicines: vec![MedicineLineInput { medicine_id: None, quantity: 2 }, med_line(5, 0)],
        lab_tests: vec!["".into(), "   ".into()],
    };
    let outcome = f.engine.apply_doctor_update(&doctor(), p.id, update, None).await.unwrap();
    assert_eq!(outcome.prescription.status, PrescriptionStatus::InitiatedByNurse);
    assert_eq!(outcome.prescription.notes.as_deref(), Some("Rest advised"));
    assert!(f.store.lab_reports_for_prescription(p.id).await.unwrap().is_empty());
    assert!(f.store.lines_for_prescription(p.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_or_retired_medicine_fails_whole_update() {
    let f = fixture();
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    let update = DoctorUpdate { medicines: vec![med_line(4242, 1)], lab_tests: vec!["CBC".into()], ..Default::default() };
    assert!(matches!(
        f.engine.apply_doctor_update(&doctor(), p.id, update, None).await,
        Err(HmsError::NotFound { entity: "medicine", .. })
    ));
    assert!(f.store.lab_reports_for_prescription(p.id).await.unwrap().is_empty());
    assert_eq!(f.engine.get_prescription(p.id).await.unwrap().status, PrescriptionStatus::InitiatedByNurse);

    let mut retired = stock(&f, "Chloroquine", 5).await;
    retired.retired = true;
    f.store.put_medicine(retired.clone()).await.unwrap();
    let update = DoctorUpdate { medicines: vec![med_line(retired.id, 1)], ..Default::default() };
    match f.engine.apply_doctor_update(&doctor(), p.id, update, None).await {
        Err(HmsError::Validation(e)) => assert_eq!(e.field(), "medicine_id"),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn missing_prescription_is_not_found() {
    let f = fixture();
    let err = f.engine.apply_doctor_update(&doctor(), 77, DoctorUpdate::default(), None).await.unwrap_err();
    assert!(matches!(err, HmsError::NotFound { entity: "prescription", .. }));
}

#[tokio::test]
async fn retried_update_with_key_creates_no_duplicates() {
    let f = fixture();
    let a = stock(&f, "Amoxicillin", 40).await;
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    let update = DoctorUpdate {
        notes: None,
        medicines: vec![med_line(a.id, 10)],
        lab_tests: vec!["Urinalysis".into()],
    };
    let first = f
        .engine
        .apply_doctor_update(&doctor(), p.id, update.clone(), Some("submit-abc".into()))
        .await
        .unwrap();
    let second = f
        .engine
        .apply_doctor_update(&doctor(), p.id, update, Some("submit-abc".into()))
        .await
        .unwrap();
    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(second.medicines, first.medicines);
    assert_eq!(second.lab_reports, first.lab_reports);
    assert_eq!(f.store.lines_for_prescription(p.id).await.unwrap().len(), 1);
    assert_eq!(f.store.lab_reports_for_prescription(p.id).await.unwrap().len(), 1);

    let other = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    assert!(matches!(
        f.engine.apply_doctor_update(&doctor(), other.id, DoctorUpdate::default(), Some("submit-abc".into())).await,
        Err(HmsError::Conflict(_))
    ));
}

#[tokio::test]
async fn single_attachments_keep_existing_requests() {
    let f = fixture();
    let a = stock(&f, "Ibuprofen", 40).await;
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    f.engine
        .request_lab_test(&doctor(), RequestLabTest { prescription_id: p.id, test_name: "Malaria smear".into() })
        .await
        .unwrap();
    assert_eq!(f.engine.get_prescription(p.id).await.unwrap().status, PrescriptionStatus::LabTestRequested);
    let line = f
        .engine
        .attach_medicine(&doctor(), AttachMedicine { prescription_id: p.id, medicine_id: a.id, quantity: 4 })
        .await
        .unwrap();
    assert_eq!(line.quantity_prescribed, 4);
    assert_eq!(
        f.engine.get_prescription(p.id).await.unwrap().status,
        PrescriptionStatus::PrescribedAndLabTestRequested
    );
}

#[tokio::test]
async fn rejected_single_attachment_changes_nothing() {
    let f = fixture();
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    let history = f.store.audit_for(&EntityRef::Prescription(p.id)).await.unwrap().len();

    let blank = f
        .engine
        .request_lab_test(&doctor(), RequestLabTest { prescription_id: p.id, test_name: "   ".into() })
        .await;
    assert!(matches!(blank, Err(HmsError::Validation(ValidationError::MissingField(ref field))) if field == "test_name"));
    let no_medicine = f
        .engine
        .attach_medicine(&doctor(), AttachMedicine { prescription_id: p.id, medicine_id: 0, quantity: 2 })
        .await;
    assert!(matches!(no_medicine, Err(HmsError::Validation(ValidationError::MissingField(ref field))) if field == "medicine_id"));

    let stored = f.engine.get_prescription(p.id).await.unwrap();
    assert_eq!(stored.doctor_id, None);
    assert_eq!(stored.updated_at, p.updated_at);
    assert_eq!(stored.status, PrescriptionStatus::InitiatedByNurse);
    assert_eq!(f.store.audit_for(&EntityRef::Prescription(p.id)).await.unwrap().len(), history);
    assert!(f.store.lines_for_prescription(p.id).await.unwrap().is_empty());
    assert!(f.store.lab_reports_for_prescription(p.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn lab_result_leaves_parent_status_by_default() {
    let f = fixture();
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    let update = DoctorUpdate { lab_tests: vec!["CBC".into()], ..Default::default() };
    let outcome = f.engine.apply_doctor_update(&doctor(), p.id, update, None).await.unwrap();
    let report_id = outcome.lab_reports[0].id;

    let result = f.engine.apply_lab_result(&tech(), report_id, "results/cbc-1.pdf".into()).await.unwrap();
    assert_eq!(result.lab_report.status, LabReportStatus::Completed);
    assert_eq!(result.lab_report.result.as_deref(), Some("results/cbc-1.pdf"));
    assert!(result.lab_report.updated_at.is_some());
    assert!(!result.propagated);
    assert_eq!(f.engine.get_prescription(p.id).await.unwrap().status, PrescriptionStatus::LabTestRequested);

    assert!(matches!(
        f.engine.apply_lab_result(&tech(), report_id, " ".into()).await,
        Err(HmsError::Validation(_))
    ));
    assert!(matches!(
        f.engine.apply_lab_result(&tech(), 999, "x".into()).await,
        Err(HmsError::NotFound { .. })
    ));
}

#[tokio::test]
async fn lab_completion_propagates_when_enabled() {
    let f = fixture_with(LifecycleConfig { propagate_lab_completion: true });
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    let update = DoctorUpdate { lab_tests: vec!["CBC".into(), "Widal".into()], ..Default::default() };
    let outcome = f.engine.apply_doctor_update(&doctor(), p.id, update, None).await.unwrap();

    let first = f.engine.apply_lab_result(&tech(), outcome.lab_reports[0].id, "a".into()).await.unwrap();
    assert!(!first.propagated);
    assert_eq!(first.prescription_status, PrescriptionStatus::LabTestRequested);

    let second = f.engine.apply_lab_result(&tech(), outcome.lab_reports[1].id, "b".into()).await.unwrap();
    assert!(second.propagated);
    assert_eq!(f.engine.get_prescription(p.id).await.unwrap().status, PrescriptionStatus::LabTestCompleted);

    let history = AuditTrail::new(f.store.clone()).history(&EntityRef::Prescription(p.id)).await.unwrap();
    assert!(history.iter().any(|e| e.action == AuditAction::LabCompletionPropagated));
}

#[tokio::test]
async fn issuing_decrements_stock_and_marks_issued() {
    let f = fixture();
    let a = stock(&f, "Paracetamol", 20).await;
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    let update = DoctorUpdate { medicines: vec![med_line(a.id, 6)], ..Default::default() };
    let line = f.engine.apply_doctor_update(&doctor(), p.id, update, None).await.unwrap().medicines[0].clone();

    let first = f
        .engine
        .issue_medicines(&pharmacist(), p.id, vec![IssueLine { prescription_medicine_id: line.id, quantity: 4 }])
        .await
        .unwrap();
    assert_eq!(first.prescription.status, PrescriptionStatus::MedicationIssued);
    assert_eq!(first.medicines[0].quantity_issued, Some(4));
    assert_eq!(first.medicines[0].issued_by.as_deref(), Some("pharm-1"));
    assert_eq!(f.ledger.get_medicine(a.id).await.unwrap().quantity, 16);

    // cumulative: 4 + 2 reaches the prescribed 6
    let second = f
        .engine
        .issue_medicines(&pharmacist(), p.id, vec![IssueLine { prescription_medicine_id: line.id, quantity: 2 }])
        .await
        .unwrap();
    assert_eq!(second.medicines[0].quantity_issued, Some(6));
    assert_eq!(f.ledger.get_medicine(a.id).await.unwrap().quantity, 14);
}

#[tokio::test]
async fn over_issuing_a_line_issues_nothing() {
    let f = fixture();
    let a = stock(&f, "Paracetamol", 50).await;
    let b = stock(&f, "ORS", 50).await;
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    let update = DoctorUpdate { medicines: vec![med_line(a.id, 2), med_line(b.id, 3)], ..Default::default() };
    let lines = f.engine.apply_doctor_update(&doctor(), p.id, update, None).await.unwrap().medicines;

    let err = f
        .engine
        .issue_medicines(
            &pharmacist(),
            p.id,
            vec![
                IssueLine { prescription_medicine_id: lines[0].id, quantity: 2 },
                IssueLine { prescription_medicine_id: lines[1].id, quantity: 4 },
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HmsError::Validation(_)));
    assert_eq!(f.ledger.get_medicine(a.id).await.unwrap().quantity, 50);
    assert_eq!(f.ledger.get_medicine(b.id).await.unwrap().quantity, 50);
    assert!(f.store.lines_for_prescription(p.id).await.unwrap().iter().all(|l| l.quantity_issued.is_none()));
    assert_eq!(f.engine.get_prescription(p.id).await.unwrap().status, PrescriptionStatus::PrescribedByDoctor);
}

#[tokio::test]
async fn insufficient_stock_names_the_medicine() {
    let f = fixture();
    let a = stock(&f, "Azithromycin", 3).await;
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    let update = DoctorUpdate { medicines: vec![med_line(a.id, 5)], ..Default::default() };
    let line = f.engine.apply_doctor_update(&doctor(), p.id, update, None).await.unwrap().medicines[0].clone();

    match f
        .engine
        .issue_medicines(&pharmacist(), p.id, vec![IssueLine { prescription_medicine_id: line.id, quantity: 5 }])
        .await
    {
        Err(HmsError::InsufficientStock { medicine, requested, available, .. }) => {
            assert_eq!(medicine, "Azithromycin");
            assert_eq!((requested, available), (5, 3));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(f.ledger.get_medicine(a.id).await.unwrap().quantity, 3);
}

#[tokio::test]
async fn issuing_before_prescribing_is_an_invalid_transition() {
    let f = fixture();
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    let err = f
        .engine
        .issue_medicines(&pharmacist(), p.id, vec![IssueLine { prescription_medicine_id: 1, quantity: 1 }])
        .await
        .unwrap_err();
    assert!(matches!(err, HmsError::InvalidTransition { from: PrescriptionStatus::InitiatedByNurse, .. }));
}

#[tokio::test]
async fn issued_prescription_rejects_new_attachments() {
    let f = fixture();
    let a = stock(&f, "Paracetamol", 10).await;
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    let update = DoctorUpdate { medicines: vec![med_line(a.id, 1)], ..Default::default() };
    let line = f.engine.apply_doctor_update(&doctor(), p.id, update, None).await.unwrap().medicines[0].clone();
    f.engine
        .issue_medicines(&pharmacist(), p.id, vec![IssueLine { prescription_medicine_id: line.id, quantity: 1 }])
        .await
        .unwrap();

    let more = DoctorUpdate { lab_tests: vec!["X-ray".into()], ..Default::default() };
    assert!(matches!(
        f.engine.apply_doctor_update(&doctor(), p.id, more, None).await,
        Err(HmsError::InvalidTransition { .. })
    ));
    let notes_only = DoctorUpdate { notes: Some("Follow up in a week".into()), ..Default::default() };
    let outcome = f.engine.apply_doctor_update(&doctor(), p.id, notes_only, None).await.unwrap();
    assert_eq!(outcome.prescription.status, PrescriptionStatus::MedicationIssued);
}

#[tokio::test]
async fn delete_cascades() {
    let f = fixture();
    let a = stock(&f, "Paracetamol", 10).await;
    let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
    let update = DoctorUpdate { medicines: vec![med_line(a.id, 1)], lab_tests: vec!["CBC".into()], ..Default::default() };
    f.engine.apply_doctor_update(&doctor(), p.id, update, None).await.unwrap();

    let admin = Actor::new("admin", Role::Admin);
    f.engine.delete_prescription(&admin, p.id).await.unwrap();
    assert!(f.store.lines_for_prescription(p.id).await.unwrap().is_empty());
    assert!(f.store.lab_reports_for_prescription(p.id).await.unwrap().is_empty());
    assert!(matches!(f.engine.delete_prescription(&admin, p.id).await, Err(HmsError::NotFound { .. })));
}

#[tokio::test]
async fn concurrent_issuance_never_oversells() {
    let f = fixture();
    let a = stock(&f, "Paracetamol", 10).await;
    let mut handles = Vec::new();
    for _ in 0..6 {
        let p = f.engine.create_prescription(&nurse(), intake()).await.unwrap();
        let update = DoctorUpdate { medicines: vec![med_line(a.id, 3)], ..Default::default() };
        let line = f.engine.apply_doctor_update(&doctor(), p.id, update, None).await.unwrap().medicines[0].clone();
        let engine = f.engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .issue_medicines(&pharmacist(), p.id, vec![IssueLine { prescription_medicine_id: line.id, quantity: 3 }])
                .await
                .is_ok()
        }));
    }
    let mut issued = 0;
    for handle in handles {
        if handle.await.unwrap() {
            issued += 1;
        }
    }
    assert_eq!(issued, 3);
    assert_eq!(f.ledger.get_medicine(a.id).await.unwrap().quantity, 1);
}
