// models/src/lib.rs

//! Shared record types, read models and the error taxonomy of the
//! prescription lifecycle service.

pub mod errors;
pub mod identifiers;
pub mod medical;
pub mod views;

pub use errors::{HmsError, HmsResult, RowFailure, ValidationError, ValidationResult};
pub use identifiers::{RecordId, StudentId};
