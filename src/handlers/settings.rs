use axum::{extract::State, Json};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::models::OnboardingPolicy;
use crate::AppState;

use super::ApiError;

/// GET /api/onboarding/settings
pub async fn get_policy(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<OnboardingPolicy>, ApiError> {
    let policy = state.store.get_policy().await?;
    Ok(Json(policy))
}

/// PUT /api/onboarding/settings. Takes effect for the next task picked up.
pub async fn update_policy(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(policy): Json<OnboardingPolicy>,
) -> Result<Json<OnboardingPolicy>, ApiError> {
    policy.validate().map_err(ApiError::bad_request)?;
    state.store.update_policy(&policy).await?;
    tracing::info!("Onboarding policy updated by {}", auth.claims.sub);
    Ok(Json(policy))
}
