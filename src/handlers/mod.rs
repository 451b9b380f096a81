pub mod devices;
pub mod inventory;
pub mod onboarding;
pub mod settings;
pub mod sites;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::onboarding::StoreError;

/// Shared pagination query parameters for list endpoints.
/// Defaults: limit=100, offset=0. Max limit=1000.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl PaginationQuery {
    /// Clamp limit to [1, 1000] and offset to >= 0
    pub fn sanitize(&self) -> (i64, i64) {
        let limit = self.limit.clamp(1, 1000);
        let offset = self.offset.max(0);
        (limit, offset)
    }
}

fn default_page_limit() -> i64 {
    100
}

/// Error body: {"error": "message"}
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// API error type
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{} not found", resource),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.into(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(nf) = err.downcast_ref::<crate::db::NotFoundError>() {
            return Self {
                status: StatusCode::NOT_FOUND,
                message: nf.to_string(),
            };
        }
        if let Some(sqlx::Error::Database(db_err)) = err.downcast_ref::<sqlx::Error>() {
            if db_err.is_foreign_key_violation() {
                return Self::conflict("resource is still referenced by other records");
            }
        }
        match crate::db::store_error(err) {
            StoreError::UniqueViolation(msg) => Self::conflict(msg),
            other => Self::internal(other.to_string()),
        }
    }
}

/// Response helper: return 201 Created with JSON body
pub fn created<T: Serialize>(item: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(item))
}

/// Healthcheck endpoint, always 200 OK
pub async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "device-onboarding",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps() {
        let page = PaginationQuery { limit: 5000, offset: -3 };
        assert_eq!(page.sanitize(), (1000, 0));
        let page = PaginationQuery { limit: 0, offset: 10 };
        assert_eq!(page.sanitize(), (1, 10));
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err: anyhow::Error = crate::db::NotFoundError::new("Device", "7").into();
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.message, "Device not found: 7");
    }

    #[test]
    fn test_other_errors_map_to_500() {
        let api = ApiError::from(anyhow::anyhow!("disk full"));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
