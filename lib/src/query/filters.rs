// lib/src/query/filters.rs

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use models::medical::{MedicineCategory, PrescriptionStatus, StockStatus};
use models::{ValidationError, ValidationResult};

/// Query string of `GET /prescriptions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrescriptionQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub date: Option<String>,
    #[serde(alias = "sortBy")]
    pub sort: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub queue: Option<String>,
}

/// Query string of `GET /lab-reports`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabReportQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub date: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub queue: Option<String>,
}

/// Query string of `GET /medicines`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicineQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub stock: Option<String>,
    pub expiring: Option<bool>,
    #[serde(alias = "sortBy")]
    pub sort: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_retired: bool,
}

/// `None`, blank and `all` all mean "no filter".
pub fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Newest first.
    Created,
    StudentId,
    StudentName,
    MedicineName,
    Quantity,
    ExpiryDate,
}

impl FromStr for SortKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "date" | "created" | "created_at" => Ok(SortKey::Created),
            // the nurse dashboard labels its student id sort "name"
            "name" | "student_id" | "studentid" => Ok(SortKey::StudentId),
            "student_name" | "studentname" => Ok(SortKey::StudentName),
            "medicine" | "medicine_name" => Ok(SortKey::MedicineName),
            "quantity" | "stock" => Ok(SortKey::Quantity),
            "expiry" | "expiry_date" => Ok(SortKey::ExpiryDate),
            other => Err(ValidationError::invalid("sort", format!("unknown sort key '{}'", other))),
        }
    }
}

pub fn sort_key(value: &Option<String>, default: SortKey) -> ValidationResult<SortKey> {
    match active(value) {
        Some(raw) => raw.parse(),
        None => Ok(default),
    }
}

/// Exact status label; anything outside the enumerated set is rejected.
pub fn prescription_status(value: &Option<String>) -> ValidationResult<Option<PrescriptionStatus>> {
    active(value).map(str::parse::<PrescriptionStatus>).transpose()
}

pub fn category(value: &Option<String>) -> ValidationResult<Option<MedicineCategory>> {
    active(value).map(str::parse::<MedicineCategory>).transpose()
}

pub fn stock_status(value: &Option<String>) -> ValidationResult<Option<StockStatus>> {
    active(value)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "critical" => Ok(StockStatus::Critical),
            "low" => Ok(StockStatus::Low),
            "good" => Ok(StockStatus::Good),
            other => Err(ValidationError::invalid("stock", format!("unknown stock level '{}'", other))),
        })
        .transpose()
}

pub fn day(value: &Option<String>) -> ValidationResult<Option<NaiveDate>> {
    active(value)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| ValidationError::invalid("date", format!("'{}' is not a YYYY-MM-DD date", raw)))
        })
        .transpose()
}

pub fn on_day(timestamp: &DateTime<Utc>, day: Option<NaiveDate>) -> bool {
    day.map_or(true, |d| timestamp.date_naive() == d)
}

/// Case-insensitive substring match against any of `fields`.
#[derive(Debug, Clone)]
pub struct SearchTerm(Option<String>);

impl SearchTerm {
    pub fn new(value: &Option<String>) -> Self {
        SearchTerm(
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_lowercase),
        )
    }

    pub fn matches(&self, fields: &[Option<&str>]) -> bool {
        match &self.0 {
            None => true,
            Some(needle) => fields.iter().flatten().any(|field| field.to_lowercase().contains(needle)),
        }
    }
}

/// Role work queues over prescriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {
    Doctor,
    Pharmacist,
}

pub fn queue(value: &Option<String>) -> ValidationResult<Option<Queue>> {
    active(value)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "doctor" => Ok(Queue::Doctor),
            "pharmacist" => Ok(Queue::Pharmacist),
            other => Err(ValidationError::invalid("queue", format!("unknown queue '{}'", other))),
        })
        .transpose()
}
