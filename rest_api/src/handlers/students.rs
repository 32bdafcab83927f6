// rest_api/src/handlers/students.rs

use axum::extract::State;
use axum::Json;

use models::medical::Student;
use security::permissions;

use crate::auth::AuthUser;
use crate::errors::ApiResult;
use crate::extract::ApiPath;
use crate::state::AppState;

/// Students may only look themselves up.
pub async fn get_student(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Student>> {
    let actor = user.require(&state, permissions::STUDENTS_READ)?;
    Ok(Json(state.services.query.student(actor, &id).await?))
}
