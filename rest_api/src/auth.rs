// rest_api/src/auth.rs

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use models::medical::Actor;
use security::{bearer_token, validate_token};

use crate::errors::RestApiError;
use crate::state::AppState;

/// The caller, read from the bearer token's `sub` and `role` claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = RestApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        let token = bearer_token(header)?;
        let claims = validate_token(token, &state.jwt_secret)?;
        Ok(AuthUser(claims.actor()?))
    }
}

impl AuthUser {
    /// Fails with 403 unless the caller's role grants `permission`.
    pub fn require(&self, state: &AppState, permission: &str) -> Result<&Actor, RestApiError> {
        state.roles.require(self.0.role, permission)?;
        Ok(&self.0)
    }
}
