// rest_api/src/handlers/medicines.rs

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use lib::query::MedicineQuery;
use models::medical::{MedicineInput, MedicinePatch};
use models::views::{MedicineView, Page};
use models::RecordId;
use security::permissions;

use crate::auth::AuthUser;
use crate::errors::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

pub async fn list_medicines(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<MedicineQuery>,
) -> ApiResult<Json<Page<MedicineView>>> {
    user.require(&state, permissions::MEDICINES_READ)?;
    Ok(Json(state.services.query.list_medicines(&query).await?))
}

pub async fn add_medicine(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<MedicineInput>,
) -> ApiResult<(StatusCode, Json<MedicineView>)> {
    let actor = user.require(&state, permissions::MEDICINES_MANAGE)?;
    let medicine = state.services.inventory.add_medicine(actor, input).await?;
    Ok((StatusCode::CREATED, Json(state.services.query.view(medicine))))
}

/// All-valid batches answer 201; otherwise 422 with the applied ids and the
/// failed rows.
pub async fn bulk_import(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(rows): ApiJson<Vec<MedicineInput>>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let actor = user.require(&state, permissions::MEDICINES_MANAGE)?;
    let imported = state.services.inventory.bulk_import(actor, rows).await?;
    let views: Vec<MedicineView> = imported.into_iter().map(|m| state.services.query.view(m)).collect();
    Ok((StatusCode::CREATED, Json(json!({ "imported": views.len(), "medicines": views }))))
}

pub async fn get_medicine(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<MedicineView>> {
    user.require(&state, permissions::MEDICINES_READ)?;
    Ok(Json(state.services.query.medicine(id).await?))
}

pub async fn edit_medicine(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(patch): ApiJson<MedicinePatch>,
) -> ApiResult<Json<MedicineView>> {
    let actor = user.require(&state, permissions::MEDICINES_MANAGE)?;
    let medicine = state.services.inventory.edit_medicine(actor, id, patch).await?;
    Ok(Json(state.services.query.view(medicine)))
}

pub async fn delete_medicine(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<Json<Value>> {
    let actor = user.require(&state, permissions::MEDICINES_MANAGE)?;
    let outcome = state.services.inventory.delete_medicine(actor, id).await?;
    Ok(Json(json!({ "status": "success", "id": id, "outcome": outcome })))
}
