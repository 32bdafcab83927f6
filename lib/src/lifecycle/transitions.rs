// lib/src/lifecycle/transitions.rs

use std::fmt;

use models::medical::PrescriptionStatus;
use models::{HmsError, HmsResult};

use PrescriptionStatus::*;

/// Status-changing actions. A doctor update that attaches nothing is not an
/// action: it leaves the status where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Prescribe,
    RequestLabs,
    PrescribeAndRequestLabs,
    CompleteLabs,
    IssueMedication,
}

impl LifecycleAction {
    /// Maps what a doctor attached to the action it represents.
    pub fn from_attachments(medicines: bool, lab_tests: bool) -> Option<Self> {
        match (medicines, lab_tests) {
            (true, true) => Some(LifecycleAction::PrescribeAndRequestLabs),
            (true, false) => Some(LifecycleAction::Prescribe),
            (false, true) => Some(LifecycleAction::RequestLabs),
            (false, false) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Prescribe => "prescribe medicines on",
            LifecycleAction::RequestLabs => "request lab tests on",
            LifecycleAction::PrescribeAndRequestLabs => "prescribe medicines and request lab tests on",
            LifecycleAction::CompleteLabs => "complete lab tests on",
            LifecycleAction::IssueMedication => "issue medicines for",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transition table. Pairs not listed are invalid.
pub fn next_status(from: PrescriptionStatus, action: LifecycleAction) -> HmsResult<PrescriptionStatus> {
    let to = match (from, action) {
        (MedicationIssued, LifecycleAction::Prescribe)
        | (MedicationIssued, LifecycleAction::RequestLabs)
        | (MedicationIssued, LifecycleAction::PrescribeAndRequestLabs) => None,
        (_, LifecycleAction::Prescribe) => Some(PrescribedByDoctor),
        (_, LifecycleAction::RequestLabs) => Some(LabTestRequested),
        (_, LifecycleAction::PrescribeAndRequestLabs) => Some(PrescribedAndLabTestRequested),

        (LabTestRequested, LifecycleAction::CompleteLabs)
        | (PrescribedAndLabTestRequested, LifecycleAction::CompleteLabs)
        | (LabTestCompleted, LifecycleAction::CompleteLabs) => Some(LabTestCompleted),
        (_, LifecycleAction::CompleteLabs) => None,

        (PrescribedByDoctor, LifecycleAction::IssueMedication)
        | (PrescribedAndLabTestRequested, LifecycleAction::IssueMedication)
        | (LabTestCompleted, LifecycleAction::IssueMedication)
        | (MedicationIssued, LifecycleAction::IssueMedication) => Some(MedicationIssued),
        (_, LifecycleAction::IssueMedication) => None,
    };
    to.ok_or_else(|| HmsError::InvalidTransition { from, action: action.to_string() })
}

/// Statuses a pharmacist can issue from.
pub fn allows_issuance(status: PrescriptionStatus) -> bool {
    next_status(status, LifecycleAction::IssueMedication).is_ok()
}

/// Statuses waiting on a doctor.
pub fn awaits_doctor(status: PrescriptionStatus) -> bool {
    matches!(status, InitiatedByNurse | LabTestCompleted)
}
