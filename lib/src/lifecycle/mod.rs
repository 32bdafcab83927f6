// lib/src/lifecycle/mod.rs

pub mod engine;
pub mod transitions;

pub use engine::{DoctorUpdateOutcome, IssueOutcome, LabResultOutcome, LifecycleEngine};
pub use transitions::{allows_issuance, awaits_doctor, next_status, LifecycleAction};

#[cfg(test)]
mod tests;
