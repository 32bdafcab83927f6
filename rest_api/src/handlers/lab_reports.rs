// rest_api/src/handlers/lab_reports.rs

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use lib::lifecycle::LabResultOutcome;
use lib::query::LabReportQuery;
use models::medical::{LabReport, LabResultInput, RequestLabTest};
use models::views::{LabReportSummary, Page};
use models::RecordId;
use security::permissions;

use crate::auth::AuthUser;
use crate::errors::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

pub async fn request_lab_test(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<RequestLabTest>,
) -> ApiResult<(StatusCode, Json<LabReport>)> {
    let actor = user.require(&state, permissions::PRESCRIPTIONS_REVIEW)?;
    let report = state.services.lifecycle.request_lab_test(actor, request).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list_lab_reports(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<LabReportQuery>,
) -> ApiResult<Json<Page<LabReportSummary>>> {
    let actor = user.require(&state, permissions::LAB_REPORTS_READ)?;
    Ok(Json(state.services.query.list_lab_reports(actor, &query).await?))
}

/// Attaches the result and marks the report completed.
pub async fn upload_result(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(input): ApiJson<LabResultInput>,
) -> ApiResult<Json<LabResultOutcome>> {
    let actor = user.require(&state, permissions::LAB_REPORTS_UPDATE)?;
    Ok(Json(state.services.lifecycle.apply_lab_result(actor, id, input.result).await?))
}
