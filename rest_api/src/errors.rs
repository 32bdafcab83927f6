// rest_api/src/errors.rs

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{error, warn};

use models::HmsError;
use security::AuthError;

#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Hms(#[from] HmsError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<JsonRejection> for RestApiError {
    fn from(rejection: JsonRejection) -> Self {
        RestApiError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for RestApiError {
    fn from(rejection: QueryRejection) -> Self {
        RestApiError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for RestApiError {
    fn from(rejection: PathRejection) -> Self {
        RestApiError::InvalidInput(rejection.body_text())
    }
}

fn status_and_fields(err: &HmsError) -> (StatusCode, Map<String, Value>) {
    let mut fields = Map::new();
    let status = match err {
        HmsError::NotFound { entity, id } => {
            fields.insert("entity".into(), json!(entity));
            fields.insert("id".into(), json!(id));
            StatusCode::NOT_FOUND
        }
        HmsError::Validation(v) => {
            fields.insert("field".into(), json!(v.field()));
            StatusCode::BAD_REQUEST
        }
        HmsError::InsufficientStock { medicine_id, requested, available, .. } => {
            fields.insert("medicine_id".into(), json!(medicine_id));
            fields.insert("requested".into(), json!(requested));
            fields.insert("available".into(), json!(available));
            StatusCode::CONFLICT
        }
        HmsError::InvalidTransition { from, action } => {
            fields.insert("from".into(), json!(from));
            fields.insert("action".into(), json!(action));
            StatusCode::CONFLICT
        }
        HmsError::Conflict(_) => StatusCode::CONFLICT,
        HmsError::PartialApplication { applied, failed } => {
            fields.insert("applied".into(), json!(applied));
            fields.insert("failed".into(), json!(failed));
            StatusCode::UNPROCESSABLE_ENTITY
        }
        HmsError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        HmsError::StoreUnavailable(_) => {
            fields.insert("retryable".into(), json!(true));
            StatusCode::SERVICE_UNAVAILABLE
        }
        HmsError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, fields)
}

// Implement IntoResponse for RestApiError to convert it into an HTTP response
impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let (status, mut body) = match &self {
            RestApiError::Hms(e) => status_and_fields(e),
            RestApiError::Auth(AuthError::Forbidden { .. }) => (StatusCode::FORBIDDEN, Map::new()),
            RestApiError::Auth(AuthError::JwtError(_)) => (StatusCode::INTERNAL_SERVER_ERROR, Map::new()),
            RestApiError::Auth(_) => (StatusCode::UNAUTHORIZED, Map::new()),
            RestApiError::InvalidInput(_) => (StatusCode::BAD_REQUEST, Map::new()),
        };
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self);
        } else {
            warn!("Request rejected with {}: {}", status, self);
        }
        body.insert("status".into(), json!("error"));
        body.insert("message".into(), json!(self.to_string()));
        (status, Json(Value::Object(body))).into_response()
    }
}

pub type ApiResult<T> = Result<T, RestApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use models::{RowFailure, ValidationError};

    fn parts(err: RestApiError) -> (StatusCode, Value) {
        if let RestApiError::Hms(e) = &err {
            let (status, fields) = status_and_fields(e);
            return (status, Value::Object(fields));
        }
        (err.into_response().status(), Value::Object(Map::new()))
    }

    #[test]
    fn validation_maps_to_400_with_field() {
        let (status, body) = parts(HmsError::from(ValidationError::invalid("quantity", "must be positive")).into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "quantity");
    }

    #[test]
    fn store_unavailable_is_retryable() {
        let (status, body) = parts(HmsError::StoreUnavailable("disk".into()).into());
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["retryable"], true);
    }

    #[test]
    fn partial_application_lists_rows() {
        let err = HmsError::PartialApplication {
            applied: vec![1],
            failed: vec![RowFailure { row: 2, reason: "bad".into() }],
        };
        let (status, body) = parts(err.into());
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["failed"][0]["row"], 2);
    }

    #[test]
    fn auth_failures() {
        assert_eq!(parts(AuthError::MissingToken.into()).0, StatusCode::UNAUTHORIZED);
        let forbidden = AuthError::Forbidden { role: models::medical::Role::Student, permission: "x".into() };
        assert_eq!(parts(forbidden.into()).0, StatusCode::FORBIDDEN);
        assert_eq!(parts(HmsError::not_found("medicine", 4).into()).0, StatusCode::NOT_FOUND);
    }
}
