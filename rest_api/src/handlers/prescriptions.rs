// rest_api/src/handlers/prescriptions.rs

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::info;

use lib::lifecycle::{DoctorUpdateOutcome, IssueOutcome};
use lib::query::PrescriptionQuery;
use models::medical::{AttachMedicine, AuditEntry, DoctorUpdate, IssueRequest, NewPrescription, Prescription, PrescriptionMedicine};
use models::views::{Page, PrescriptionDetail, PrescriptionSummary};
use models::RecordId;
use security::permissions;

use crate::auth::AuthUser;
use crate::errors::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub async fn list_prescriptions(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<PrescriptionQuery>,
) -> ApiResult<Json<Page<PrescriptionSummary>>> {
    let actor = user.require(&state, permissions::PRESCRIPTIONS_READ)?;
    Ok(Json(state.services.query.list_prescriptions(actor, &query).await?))
}

pub async fn create_prescription(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<NewPrescription>,
) -> ApiResult<(StatusCode, Json<Prescription>)> {
    let actor = user.require(&state, permissions::PRESCRIPTIONS_CREATE)?;
    let prescription = state.services.lifecycle.create_prescription(actor, payload).await?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

pub async fn get_prescription(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<PrescriptionDetail>> {
    let actor = user.require(&state, permissions::PRESCRIPTIONS_READ)?;
    Ok(Json(state.services.query.prescription_detail(actor, id).await?))
}

/// The doctor's review. A repeated `Idempotency-Key` replays the first outcome.
pub async fn update_prescription(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<RecordId>,
    headers: HeaderMap,
    ApiJson(update): ApiJson<DoctorUpdate>,
) -> ApiResult<Json<DoctorUpdateOutcome>> {
    let actor = user.require(&state, permissions::PRESCRIPTIONS_REVIEW)?;
    let key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let outcome = state.services.lifecycle.apply_doctor_update(actor, id, update, key).await?;
    if outcome.replayed {
        info!("Replayed doctor update for prescription {}", id);
    }
    Ok(Json(outcome))
}

pub async fn delete_prescription(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<StatusCode> {
    let actor = user.require(&state, permissions::SUPERUSER)?;
    state.services.lifecycle.delete_prescription(actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn prescription_history(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    user.require(&state, permissions::AUDIT_READ)?;
    Ok(Json(state.services.query.prescription_history(id).await?))
}

pub async fn issue_medicines(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(request): ApiJson<IssueRequest>,
) -> ApiResult<Json<IssueOutcome>> {
    let actor = user.require(&state, permissions::MEDICINES_ISSUE)?;
    Ok(Json(state.services.lifecycle.issue_medicines(actor, id, request.lines).await?))
}

pub async fn attach_medicine(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<AttachMedicine>,
) -> ApiResult<(StatusCode, Json<PrescriptionMedicine>)> {
    let actor = user.require(&state, permissions::PRESCRIPTIONS_REVIEW)?;
    let line = state.services.lifecycle.attach_medicine(actor, request).await?;
    Ok((StatusCode::CREATED, Json(line)))
}
