// models/src/medical/mod.rs

pub mod audit;
pub mod lab_report;
pub mod medicine;
pub mod prescription;
pub mod prescription_medicine;
pub mod requests;
pub mod role;
pub mod status;
pub mod student;

pub use audit::{AuditAction, AuditEntry, EntityRef};
pub use lab_report::{LabReport, NewLabReport};
pub use medicine::{Medicine, MedicineCategory, MedicineInput, MedicinePatch, NewMedicine, StockStatus};
pub use prescription::{NewPrescription, Prescription, Vitals};
pub use prescription_medicine::{NewPrescriptionMedicine, PrescriptionMedicine};
pub use requests::{AttachMedicine, DoctorUpdate, IssueLine, IssueRequest, LabResultInput, MedicineLineInput, RequestLabTest};
pub use role::{Actor, Role};
pub use status::{LabReportStatus, PrescriptionStatus};
pub use student::{Student, StudentEnrollment};
