// models/src/identifiers.rs

use core::ops::Deref;
use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};

/// Integer identity of prescriptions, line items, lab reports and medicines.
pub type RecordId = u64;

static STUDENT_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[rR]\d{6}$").expect("student id pattern is valid"));

/// A patient identifier, e.g. `R200137`. Stored upper-cased.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentId(String);

impl StudentId {
    /// Creates a new student identifier.
    ///
    /// # Errors
    /// Returns a `ValidationError` unless `value` is an `R` followed by six
    /// digits (either case).
    pub fn new(value: &str) -> ValidationResult<Self> {
        let trimmed = value.trim();
        if !STUDENT_ID_PATTERN.is_match(trimmed) {
            return Err(ValidationError::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Institutional mailbox derived from the identifier.
    pub fn default_email(&self) -> String {
        format!("{}@rgukitrkv.ac.in", self.0.to_ascii_lowercase())
    }
}

impl AsRef<str> for StudentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for StudentId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for StudentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for StudentId {
    type Error = ValidationError;

    fn try_from(value: String) -> ValidationResult<Self> {
        Self::new(&value)
    }
}

impl From<StudentId> for String {
    fn from(value: StudentId) -> Self {
        value.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
