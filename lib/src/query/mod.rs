// lib/src/query/mod.rs

pub mod filters;
pub mod pagination;
pub mod query_service;

pub use filters::{LabReportQuery, MedicineQuery, PrescriptionQuery};
pub use pagination::{paginate, PageRequest};
pub use query_service::QueryService;
