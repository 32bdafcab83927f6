// models/src/medical/prescription.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};
use crate::identifiers::{RecordId, StudentId};
use crate::medical::status::PrescriptionStatus;

/// Vitals captured by the nurse at intake. Free text on the wire, range
/// checked when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    /// Degrees Fahrenheit.
    #[serde(default)]
    pub temperature: Option<String>,
    /// `systolic/diastolic` in mmHg.
    #[serde(default)]
    pub blood_pressure: Option<String>,
    /// Kilograms.
    #[serde(default)]
    pub weight: Option<String>,
}

impl Vitals {
    /// Blank strings are treated as "not captured".
    pub fn normalized(self) -> Self {
        fn keep(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Vitals {
            temperature: keep(self.temperature),
            blood_pressure: keep(self.blood_pressure),
            weight: keep(self.weight),
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(temperature) = &self.temperature {
            check_range("temperature", temperature, 90.0, 110.0)?;
        }
        if let Some(weight) = &self.weight {
            check_range("weight", weight, 20.0, 300.0)?;
        }
        if let Some(bp) = &self.blood_pressure {
            let (systolic, diastolic) = bp
                .split_once('/')
                .ok_or_else(|| ValidationError::invalid("blood_pressure", "expected systolic/diastolic"))?;
            check_range("blood_pressure", systolic.trim(), 40.0, 300.0)?;
            check_range("blood_pressure", diastolic.trim(), 40.0, 300.0)?;
        }
        Ok(())
    }
}

fn check_range(field: &str, raw: &str, min: f64, max: f64) -> ValidationResult<()> {
    let value: f64 = raw
        .parse()
        .map_err(|_| ValidationError::invalid(field, format!("'{}' is not a number", raw)))?;
    if !(min..=max).contains(&value) {
        return Err(ValidationError::invalid(
            field,
            format!("{} is outside {}-{}", value, min, max),
        ));
    }
    Ok(())
}

/// The per-visit clinical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: RecordId,
    pub student_id: StudentId,
    pub nurse_id: String,
    pub doctor_id: Option<String>,
    pub chief_complaint: String,
    pub notes: Option<String>,
    pub vitals: Vitals,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prescription {
    /// `doctor_id` is absent only while the record is still with the nurse.
    pub fn doctor_invariant_holds(&self) -> bool {
        !self.status.requires_doctor() || self.doctor_id.is_some()
    }
}

/// Nurse intake payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPrescription {
    pub student_id: String,
    pub chief_complaint: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub vitals: Vitals,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals(t: Option<&str>, bp: Option<&str>, w: Option<&str>) -> Vitals {
        Vitals {
            temperature: t.map(String::from),
            blood_pressure: bp.map(String::from),
            weight: w.map(String::from),
        }
    }

    #[test]
    fn empty_vitals_are_valid() {
        assert!(Vitals::default().validate().is_ok());
        assert!(vitals(Some("  "), Some(""), None).normalized().validate().is_ok());
    }

    #[test]
    fn accepts_values_in_range() {
        assert!(vitals(Some("98.6"), Some("120/80"), Some("64")).validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let err = vitals(Some("120"), None, None).validate().unwrap_err();
        assert_eq!(err.field(), "temperature");
    }

    #[test]
    fn rejects_malformed_blood_pressure() {
        let err = vitals(None, Some("120-80"), None).validate().unwrap_err();
        assert_eq!(err.field(), "blood_pressure");
        assert!(vitals(None, Some("120/abc"), None).validate().is_err());
    }

    #[test]
    fn rejects_non_numeric_weight() {
        let err = vitals(None, None, Some("heavy")).validate().unwrap_err();
        assert_eq!(err.field(), "weight");
    }
}
