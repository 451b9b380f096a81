//! API authentication: one configured operator account, JWT bearer tokens.
//!
//! The token subject is the operator name; handlers record it as the
//! requester of the onboarding tasks they queue.

use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::handlers::{ApiError, ErrorResponse};
use crate::AppState;

/// Lifetime of issued API tokens
const TOKEN_TTL_HOURS: i64 = 24;

/// The operator allowed to drive onboarding. The password is only kept as
/// a bcrypt hash.
#[derive(Clone)]
pub struct Operator {
    pub username: String,
    password_hash: String,
}

impl Operator {
    pub fn new(username: &str, password: &str) -> anyhow::Result<Self> {
        Self::with_cost(username, password, bcrypt::DEFAULT_COST)
    }

    fn with_cost(username: &str, password: &str, cost: u32) -> anyhow::Result<Self> {
        let password_hash = bcrypt::hash(password, cost)
            .map_err(|e| anyhow::anyhow!("Failed to hash operator password: {}", e))?;
        Ok(Self {
            username: username.to_string(),
            password_hash,
        })
    }

    /// Low-cost hash for tests
    #[cfg(test)]
    pub fn for_tests(username: &str, password: &str) -> Self {
        Self::with_cost(username, password, 4).expect("bcrypt hash")
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}

impl std::fmt::Debug for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operator")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// JWT claims; `sub` is the operator name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Extractor that validates JWT and provides the authenticated operator's claims.
///
/// Add `_auth: AuthUser` to a handler's parameters to require authentication.
pub struct AuthUser {
    pub claims: Claims,
}

#[async_trait::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = decode_token(&token, &state.config.jwt_secret)?;
        Ok(AuthUser { claims })
    }
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("username and password are required"));
    }
    if !state.operator.verify(&req.username, &req.password) {
        tracing::warn!("Failed login for operator {}", req.username);
        return Err(ApiError::unauthorized("invalid credentials"));
    }

    let (token, expires_at) = issue_token(&state.operator.username, &state.config.jwt_secret)
        .map_err(|e| ApiError::internal(format!("token generation error: {}", e)))?;
    tracing::info!("Operator {} logged in", state.operator.username);

    Ok(Json(LoginResponse {
        token,
        username: state.operator.username.clone(),
        expires_at,
    }))
}

/// Authorization header first, then `?token=` (WebSocket clients can't set headers)
fn bearer_token(parts: &Parts) -> Result<String, AuthError> {
    if let Some(auth_header) = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
    {
        return auth_header
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .ok_or(AuthError::InvalidToken);
    }
    parts
        .uri
        .query()
        .and_then(|query| query.split('&').find_map(|pair| pair.strip_prefix("token=")))
        .map(str::to_string)
        .ok_or(AuthError::MissingToken)
}

fn issue_token(
    operator: &str,
    secret: &str,
) -> anyhow::Result<(String, chrono::DateTime<chrono::Utc>)> {
    let now = chrono::Utc::now();
    let exp = now + chrono::TimeDelta::hours(TOKEN_TTL_HOURS);
    let claims = Claims {
        sub: operator.to_string(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, exp))
}

fn decode_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::InvalidToken)
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authentication token"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = auth {
            builder = builder.header("authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_token_roundtrip() {
        let (token, expires_at) = issue_token("netops", "s3cret").unwrap();
        let claims = decode_token(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, "netops");
        assert_eq!(claims.exp, expires_at.timestamp() as usize);
        assert!(matches!(decode_token(&token, "other"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_token_sources() {
        assert_eq!(bearer_token(&parts("/api/devices", Some("Bearer abc"))).unwrap(), "abc");
        assert_eq!(bearer_token(&parts("/api/ws?token=xyz", None)).unwrap(), "xyz");
        assert!(matches!(
            bearer_token(&parts("/api/devices", Some("Basic abc"))),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(bearer_token(&parts("/api/devices", None)), Err(AuthError::MissingToken)));
    }

    #[test]
    fn test_operator_verify() {
        let operator = Operator::for_tests("netops", "hunter2");
        assert!(operator.verify("netops", "hunter2"));
        assert!(!operator.verify("netops", "wrong"));
        assert!(!operator.verify("admin", "hunter2"));
        assert!(!format!("{:?}", operator).contains(&operator.password_hash));
    }
}
