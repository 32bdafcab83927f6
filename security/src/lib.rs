// security/src/lib.rs

//! Bearer token handling and role permissions. Tokens are issued by the
//! external identity provider; this crate only validates them and reads the
//! `sub` and `role` claims. `generate_token` exists for development tooling.

pub mod roles;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use models::medical::{Actor, Role};

pub use roles::{permissions, RolesConfig};

/// Claims for JWT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Staff id, or the student identifier for students.
    pub sub: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: u64,
    pub iat: u64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, role: Role, ttl: Duration) -> Self {
        let now = Utc::now();
        Claims {
            sub: sub.into(),
            role: role.as_str().to_string(),
            email: None,
            exp: (now + ttl).timestamp().max(0) as u64,
            iat: now.timestamp().max(0) as u64,
        }
    }

    /// The caller these claims describe.
    pub fn actor(&self) -> Result<Actor, AuthError> {
        if self.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty subject".into()));
        }
        let role = self.role.parse::<Role>().map_err(|_| AuthError::UnknownRole(self.role.clone()))?;
        Ok(Actor::new(self.sub.trim(), role))
    }
}

/// Authentication and authorization failures.
#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token has expired")]
    Expired,
    #[error("unknown role '{0}'")]
    UnknownRole(String),
    #[error("role '{role}' lacks permission '{permission}'")]
    Forbidden { role: Role, permission: String },
    #[error("JWT error: {0}")]
    JwtError(String),
}

/// Signs `claims` with HS256.
pub fn generate_token(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::JwtError(format!("Failed to encode JWT: {}", e)))
}

/// Verifies signature and expiry, then returns the claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidToken(e.to_string()),
        })
}

/// Pulls the token out of an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.ok_or(AuthError::MissingToken)?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or_else(|| AuthError::InvalidToken("expected a Bearer token".into()))?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}
