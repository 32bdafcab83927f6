// lib/src/query/query_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use models::medical::{
    Actor, AuditEntry, EntityRef, LabReportStatus, Medicine, Prescription, PrescriptionMedicine, Role, Student,
};
use models::views::{
    DashboardStats, LabReportSummary, MedicineLineDetail, MedicineView, Page, PrescriptionDetail, PrescriptionSummary,
    Relation,
};
use models::{HmsError, HmsResult, RecordId, StudentId};

use crate::audit::AuditTrail;
use crate::config::{InventoryConfig, QueryConfig};
use crate::inventory::medicine_view;
use crate::lifecycle::{allows_issuance, awaits_doctor};
use crate::query::filters::{self, LabReportQuery, MedicineQuery, PrescriptionQuery, Queue, SearchTerm, SortKey};
use crate::query::pagination::{paginate, PageRequest};
use crate::storage_engine::RecordStore;

/// Read-only, role-scoped views over the record store.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn RecordStore>,
    audit: AuditTrail,
    inventory: InventoryConfig,
    config: QueryConfig,
}

/// The student an actor is restricted to, if any.
fn own_student(actor: &Actor) -> HmsResult<Option<StudentId>> {
    if actor.role != Role::Student {
        return Ok(None);
    }
    StudentId::new(&actor.id)
        .map(Some)
        .map_err(|_| HmsError::PermissionDenied(format!("'{}' is not a student identifier", actor.id)))
}

fn compare_names(a: &Option<String>, b: &Option<String>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

impl QueryService {
    pub fn new(store: Arc<dyn RecordStore>, audit: AuditTrail, inventory: InventoryConfig, config: QueryConfig) -> Self {
        QueryService { store, audit, inventory, config }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    async fn student_names(&self) -> HmsResult<HashMap<StudentId, String>> {
        Ok(self.store.list_students().await?.into_iter().map(|s| (s.id, s.name)).collect())
    }

    pub async fn list_prescriptions(&self, actor: &Actor, query: &PrescriptionQuery) -> HmsResult<Page<PrescriptionSummary>> {
        let scope = own_student(actor)?;
        let status = filters::prescription_status(&query.status)?;
        let day = filters::day(&query.date)?;
        let sort = filters::sort_key(&query.sort, SortKey::Created)?;
        let queue = filters::queue(&query.queue)?;
        let search = SearchTerm::new(&query.search);
        let request = PageRequest::new(query.page, query.limit, &self.config);

        let names = self.student_names().await?;
        let outstanding: HashMap<RecordId, bool> = match queue {
            Some(Queue::Pharmacist) => {
                let mut map = HashMap::new();
                for line in self.store.list_lines().await? {
                    *map.entry(line.prescription_id).or_insert(false) |= line.outstanding() > 0;
                }
                map
            }
            _ => HashMap::new(),
        };

        let mut rows: Vec<PrescriptionSummary> = self
            .store
            .list_prescriptions()
            .await?
            .into_iter()
            .filter(|p| scope.as_ref().map_or(true, |id| &p.student_id == id))
            .filter(|p| status.map_or(true, |s| p.status == s))
            .filter(|p| filters::on_day(&p.created_at, day))
            .filter(|p| match queue {
                Some(Queue::Doctor) => awaits_doctor(p.status),
                Some(Queue::Pharmacist) => {
                    allows_issuance(p.status) && outstanding.get(&p.id).copied().unwrap_or(false)
                }
                None => true,
            })
            .map(|p| PrescriptionSummary { student_name: names.get(&p.student_id).cloned(), prescription: p })
            .filter(|row| {
                search.matches(&[row.student_name.as_deref(), Some(row.prescription.student_id.as_str())])
            })
            .collect();

        match sort {
            SortKey::StudentId => rows.sort_by(|a, b| a.prescription.student_id.cmp(&b.prescription.student_id)),
            SortKey::StudentName => rows.sort_by(|a, b| compare_names(&a.student_name, &b.student_name)),
            _ => rows.sort_by(|a, b| b.prescription.created_at.cmp(&a.prescription.created_at)),
        }
        Ok(paginate(rows, request))
    }

    async fn visible_prescription(&self, actor: &Actor, id: RecordId) -> HmsResult<Prescription> {
        let prescription = self
            .store
            .get_prescription(id)
            .await?
            .ok_or_else(|| HmsError::not_found("prescription", id))?;
        if let Some(own) = own_student(actor)? {
            if prescription.student_id != own {
                return Err(HmsError::PermissionDenied(format!("prescription {} belongs to another student", id)));
            }
        }
        Ok(prescription)
    }

    /// Prescription with its patient, medicine lines and lab reports. A
    /// missing patient or medicine shows up as an `unavailable` placeholder.
    pub async fn prescription_detail(&self, actor: &Actor, id: RecordId) -> HmsResult<PrescriptionDetail> {
        let prescription = self.visible_prescription(actor, id).await?;
        let student = self.store.get_student(&prescription.student_id).await?;
        let student = Relation::from_option(student, || format!("student {} is not enrolled", prescription.student_id));

        let mut medicines = Vec::new();
        for line in self.store.lines_for_prescription(id).await? {
            medicines.push(self.line_detail(line).await?);
        }
        let lab_reports = self.store.lab_reports_for_prescription(id).await?;
        Ok(PrescriptionDetail { prescription, student, medicines, lab_reports })
    }

    async fn line_detail(&self, line: PrescriptionMedicine) -> HmsResult<MedicineLineDetail> {
        let medicine_id = line.medicine_id;
        let medicine = self.store.get_medicine(medicine_id).await?;
        Ok(MedicineLineDetail {
            line,
            medicine: Relation::from_option(medicine, || format!("medicine {} no longer exists", medicine_id)),
        })
    }

    pub async fn prescription_history(&self, id: RecordId) -> HmsResult<Vec<AuditEntry>> {
        self.audit.history(&EntityRef::Prescription(id)).await
    }

    pub async fn list_lab_reports(&self, actor: &Actor, query: &LabReportQuery) -> HmsResult<Page<LabReportSummary>> {
        let scope = own_student(actor)?;
        let day = filters::day(&query.date)?;
        let status = filters::active(&query.status).map(str::to_lowercase);
        let pending_only = match filters::active(&query.queue).map(str::to_ascii_lowercase).as_deref() {
            None => false,
            Some("pending") | Some("lab_technician") => true,
            Some(other) => {
                return Err(models::ValidationError::invalid("queue", format!("unknown queue '{}'", other)).into())
            }
        };
        let search = SearchTerm::new(&query.search);
        let request = PageRequest::new(query.page, query.limit, &self.config);

        let names = self.student_names().await?;
        let prescriptions: HashMap<RecordId, Prescription> =
            self.store.list_prescriptions().await?.into_iter().map(|p| (p.id, p)).collect();

        let mut rows: Vec<LabReportSummary> = self
            .store
            .list_lab_reports()
            .await?
            .into_iter()
            .filter(|r| !pending_only || r.status == LabReportStatus::Requested)
            .filter(|r| {
                status
                    .as_deref()
                    .map_or(true, |s| r.status.as_str().to_lowercase().contains(s))
            })
            .filter(|r| filters::on_day(&r.created_at, day))
            .filter_map(|report| {
                let parent = prescriptions.get(&report.prescription_id);
                if let Some(own) = &scope {
                    if parent.map(|p| &p.student_id) != Some(own) {
                        return None;
                    }
                }
                Some(LabReportSummary {
                    student_id: parent.map(|p| p.student_id.to_string()),
                    student_name: parent.and_then(|p| names.get(&p.student_id).cloned()),
                    notes: parent.and_then(|p| p.notes.clone()),
                    report,
                })
            })
            .filter(|row| {
                search.matches(&[row.student_name.as_deref(), row.student_id.as_deref(), Some(row.report.test_name.as_str())])
            })
            .collect();
        rows.sort_by(|a, b| b.report.created_at.cmp(&a.report.created_at));
        Ok(paginate(rows, request))
    }

    pub fn view(&self, medicine: Medicine) -> MedicineView {
        medicine_view(medicine, self.today(), &self.inventory)
    }

    pub async fn medicine(&self, id: RecordId) -> HmsResult<MedicineView> {
        let medicine = self.store.get_medicine(id).await?.ok_or_else(|| HmsError::not_found("medicine", id))?;
        Ok(self.view(medicine))
    }

    /// Inventory listing. Lowest stock first unless another order is asked for.
    pub async fn list_medicines(&self, query: &MedicineQuery) -> HmsResult<Page<MedicineView>> {
        let category = filters::category(&query.category)?;
        let stock = filters::stock_status(&query.stock)?;
        let sort = filters::sort_key(&query.sort, SortKey::Quantity)?;
        let search = SearchTerm::new(&query.search);
        let request = PageRequest::new(query.page, query.limit, &self.config);
        let today = self.today();

        let mut rows: Vec<MedicineView> = self
            .store
            .list_medicines()
            .await?
            .into_iter()
            .filter(|m| query.include_retired || !m.retired)
            .filter(|m| category.map_or(true, |c| m.category == c))
            .filter(|m| search.matches(&[Some(m.name.as_str())]))
            .map(|m| medicine_view(m, today, &self.inventory))
            .filter(|v| stock.map_or(true, |s| v.stock_status == s))
            .filter(|v| query.expiring.map_or(true, |e| v.expiring_soon == e))
            .collect();

        match sort {
            SortKey::MedicineName | SortKey::StudentName | SortKey::StudentId => {
                rows.sort_by(|a, b| a.medicine.name.to_lowercase().cmp(&b.medicine.name.to_lowercase()))
            }
            SortKey::ExpiryDate => rows.sort_by_key(|v| v.medicine.expiry_date),
            SortKey::Created => rows.sort_by(|a, b| b.medicine.created_at.cmp(&a.medicine.created_at)),
            SortKey::Quantity => rows.sort_by_key(|v| v.medicine.quantity),
        }
        Ok(paginate(rows, request))
    }

    pub async fn student(&self, actor: &Actor, id: &str) -> HmsResult<Student> {
        let id = StudentId::new(id)?;
        if let Some(own) = own_student(actor)? {
            if own != id {
                return Err(HmsError::PermissionDenied("students may only look up themselves".into()));
            }
        }
        self.store.get_student(&id).await?.ok_or_else(|| HmsError::not_found("student", id))
    }

    /// Counters for the doctor dashboard.
    pub async fn dashboard_stats(&self) -> HmsResult<DashboardStats> {
        let prescriptions = self.store.list_prescriptions().await?;
        let total_prescriptions = prescriptions.len();
        let pending_prescriptions = prescriptions.iter().filter(|p| awaits_doctor(p.status)).count();
        let lab_reports_requested = self
            .store
            .list_lab_reports()
            .await?
            .iter()
            .filter(|r| r.status == LabReportStatus::Requested)
            .count();
        Ok(DashboardStats {
            total_prescriptions,
            pending_prescriptions,
            completed_prescriptions: total_prescriptions - pending_prescriptions,
            lab_reports_requested,
        })
    }
}
