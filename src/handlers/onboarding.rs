use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::net::IpAddr;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::models::*;
use crate::onboarding::parse_bulk_csv;
use crate::utils::is_valid_hostname;
use crate::AppState;

use super::ApiError;

const MAX_TIMEOUT_SECS: u64 = 600;

/// Bulk imports larger than this are rejected outright
const MAX_BULK_ROWS: usize = 1000;

/// Reject requests the reconciler could never run
fn validate_request(req: &OnboardingRequest) -> Result<(), ApiError> {
    let target = req.target.trim();
    if target.is_empty() || req.site.trim().is_empty() {
        return Err(ApiError::bad_request("target and site are required"));
    }
    if target.contains('/') {
        return Err(ApiError::bad_request("target must be a single address, not a prefix"));
    }
    if target.parse::<IpAddr>().is_err() && !is_valid_hostname(target) {
        return Err(ApiError::bad_request("target must be an IP address or a hostname"));
    }
    if req.port == 0 {
        return Err(ApiError::bad_request("port must be between 1 and 65535"));
    }
    if req.timeout == 0 || req.timeout > MAX_TIMEOUT_SECS {
        return Err(ApiError::bad_request(format!(
            "timeout must be between 1 and {} seconds",
            MAX_TIMEOUT_SECS
        )));
    }
    if let Some(sep) = req.stack_separator {
        if sep.is_alphanumeric() || sep.is_whitespace() {
            return Err(ApiError::bad_request("stack_separator must be a punctuation character"));
        }
    }
    Ok(())
}

/// POST /api/onboarding/tasks. Returns 202 with the pending task.
pub async fn create_task(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<OnboardingRequest>,
) -> Result<(StatusCode, Json<OnboardingTask>), ApiError> {
    validate_request(&req)?;
    req.target = req.target.trim().to_string();
    req.site = req.site.trim().to_string();
    req.requested_by = Some(auth.claims.sub);

    let task = state.onboarding.submit(req).await?;
    Ok((StatusCode::ACCEPTED, Json(task)))
}

/// POST /api/onboarding/tasks/bulk with a CSV body.
/// Every row is validated before any task is queued; one bad row rejects
/// the whole file with all row errors listed.
pub async fn bulk_import(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<(StatusCode, Json<Vec<OnboardingTask>>), ApiError> {
    let mut requests = parse_bulk_csv(&body).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        ApiError::bad_request(messages.join("; "))
    })?;
    if requests.len() > MAX_BULK_ROWS {
        return Err(ApiError::bad_request(format!(
            "bulk import is limited to {} rows",
            MAX_BULK_ROWS
        )));
    }

    let invalid: Vec<String> = requests
        .iter()
        .enumerate()
        .filter_map(|(i, req)| {
            validate_request(req)
                .err()
                .map(|e| format!("Row {}: {}", i + 1, e.message()))
        })
        .collect();
    if !invalid.is_empty() {
        return Err(ApiError::bad_request(invalid.join("; ")));
    }

    let mut tasks = Vec::with_capacity(requests.len());
    for mut req in requests.drain(..) {
        req.target = req.target.trim().to_string();
        req.requested_by = Some(auth.claims.sub.clone());
        tasks.push(state.onboarding.submit(req).await?);
    }
    tracing::info!("Bulk import by {} queued {} onboarding tasks", auth.claims.sub, tasks.len());
    Ok((StatusCode::ACCEPTED, Json(tasks)))
}

/// GET /api/onboarding/tasks?site=&platform=&role=&status=&failed_reason=&requested_by=&q=&limit=
pub async fn list_tasks(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<OnboardingTask>>, ApiError> {
    let tasks = state.store.list_tasks(&filter).await?;
    Ok(Json(tasks))
}

/// GET /api/onboarding/tasks/:id
pub async fn get_task(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OnboardingTask>, ApiError> {
    let task = state
        .store
        .get_task(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("onboarding task"))?;
    Ok(Json(task))
}

/// GET /api/devices/:id/onboarding. Untracked devices report the
/// default state: enabled, never checked.
pub async fn get_device_onboarding(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<i64>,
) -> Result<Json<OnboardingDevice>, ApiError> {
    let tracked = state.store.get_onboarding_device(device_id).await?;
    Ok(Json(tracked.unwrap_or(OnboardingDevice {
        device_id,
        enabled: true,
        status: None,
        last_task_id: None,
        last_check_attempt_date: None,
        last_check_successful_date: None,
    })))
}

/// PUT /api/devices/:id/onboarding {"enabled": bool}
pub async fn update_device_onboarding(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<i64>,
    Json(req): Json<UpdateOnboardingDeviceRequest>,
) -> Result<Json<OnboardingDevice>, ApiError> {
    let tracked = state.store.set_onboarding_enabled(device_id, req.enabled).await?;
    tracing::info!(
        "Onboarding {} for device {} by {}",
        if req.enabled { "enabled" } else { "disabled" },
        device_id,
        auth.claims.sub
    );
    Ok(Json(tracked))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_request() {
        assert!(validate_request(&OnboardingRequest::new("198.51.100.5", "nyc01")).is_ok());
        assert!(validate_request(&OnboardingRequest::new("sw1.example.net", "nyc01")).is_ok());
        assert!(validate_request(&OnboardingRequest::new("2001:db8::5", "nyc01")).is_ok());

        assert!(validate_request(&OnboardingRequest::new("", "nyc01")).is_err());
        assert!(validate_request(&OnboardingRequest::new("198.51.100.5", " ")).is_err());
        assert!(validate_request(&OnboardingRequest::new("198.51.100.0/24", "nyc01")).is_err());
        assert!(validate_request(&OnboardingRequest::new("bad host!", "nyc01")).is_err());

        let mut req = OnboardingRequest::new("198.51.100.5", "nyc01");
        req.port = 0;
        assert!(validate_request(&req).is_err());

        let mut req = OnboardingRequest::new("198.51.100.5", "nyc01");
        req.timeout = 0;
        assert!(validate_request(&req).is_err());

        let mut req = OnboardingRequest::new("198.51.100.5", "nyc01");
        req.stack_separator = Some('a');
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_request_defaults_from_json() {
        let req: OnboardingRequest = serde_json::from_str(
            r#"{"target":"10.0.0.1","site":"nyc01","credentials":{"username":"u","password":"p"}}"#,
        )
        .unwrap();
        assert_eq!(req.port, 22);
        assert_eq!(req.timeout, 30);
        assert!(req.credentials.is_some());
        assert!(validate_request(&req).is_ok());
    }
}
