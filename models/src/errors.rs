// models/src/errors.rs

pub use thiserror::Error;
use serde::Serialize;

use crate::medical::PrescriptionStatus;

/// Errors raised by the prescription lifecycle service.
#[derive(Debug, Error)]
pub enum HmsError {
    #[error("{entity} with id {id} was not found")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("insufficient stock for {medicine}: requested {requested}, available {available}")]
    InsufficientStock {
        medicine_id: u64,
        medicine: String,
        requested: u32,
        available: u32,
    },

    #[error("cannot {action} a prescription in status '{from}'")]
    InvalidTransition {
        from: PrescriptionStatus,
        action: String,
    },

    #[error("{} row(s) applied, {} row(s) failed", .applied.len(), .failed.len())]
    PartialApplication {
        applied: Vec<u64>,
        failed: Vec<RowFailure>,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl HmsError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        HmsError::NotFound { entity, id: id.to_string() }
    }

    /// Transient infrastructure failures. Mutating batches are not blindly
    /// retryable unless they carried an idempotency key.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HmsError::StoreUnavailable(_))
    }
}

impl From<serde_json::Error> for HmsError {
    fn from(err: serde_json::Error) -> Self {
        HmsError::Serialization(format!("JSON processing error: {}", err))
    }
}

/// One rejected row of a bulk operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    pub row: usize,
    pub reason: String,
}

/// A validation error. Every variant names the offending field so the caller
/// can re-prompt.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// A field value is malformed or out of range.
    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },
    /// A required field is missing or blank.
    #[error("{0} is required")]
    MissingField(String),
    /// A status string outside the enumerated lifecycle set.
    #[error("unknown status '{0}'")]
    UnknownStatus(String),
    /// An identifier is malformed.
    #[error("identifier '{0}' is invalid")]
    InvalidIdentifier(String),
    /// An invalid date format was provided.
    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),
}

impl ValidationError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidField { field: field.to_string(), reason: reason.into() }
    }

    pub fn field(&self) -> &str {
        match self {
            ValidationError::InvalidField { field, .. } => field,
            ValidationError::MissingField(field) => field,
            ValidationError::UnknownStatus(_) => "status",
            ValidationError::InvalidIdentifier(_) => "id",
            ValidationError::InvalidDateFormat(_) => "date",
        }
    }
}

/// A type alias for a `Result` that returns an `HmsError` on failure.
pub type HmsResult<T> = Result<T, HmsError>;

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;
