// rest_api/src/handlers/mod.rs

pub mod lab_reports;
pub mod medicines;
pub mod prescriptions;
pub mod students;
pub mod system;
