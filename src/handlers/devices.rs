use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::models::*;
use crate::AppState;

use super::inventory::require_local_inventory;
use super::{ApiError, PaginationQuery};

/// GET /api/devices (paginated)
pub async fn list_devices(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<Vec<Device>>, ApiError> {
    require_local_inventory(&state)?;
    let (limit, offset) = page.sanitize();
    let devices = state.store.list_devices_paged(limit, offset).await?;
    Ok(Json(devices))
}

/// GET /api/devices/:id
pub async fn get_device(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Device>, ApiError> {
    require_local_inventory(&state)?;
    let device = state
        .store
        .get_device(id)
        .await?
        .ok_or_else(|| ApiError::not_found("device"))?;
    Ok(Json(device))
}

/// GET /api/devices/:id/interfaces
pub async fn list_device_interfaces(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Interface>>, ApiError> {
    require_local_inventory(&state)?;
    if state.store.get_device(id).await?.is_none() {
        return Err(ApiError::not_found("device"));
    }
    Ok(Json(state.store.list_interfaces(id).await?))
}

/// DELETE /api/devices/:id
pub async fn delete_device(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_local_inventory(&state)?;
    state.store.delete_device(id).await?;
    tracing::info!("Deleted device {}", id);
    Ok(StatusCode::NO_CONTENT)
}
