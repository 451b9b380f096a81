use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::models::*;
use crate::AppState;

use super::inventory::require_local_inventory;
use super::{created, ApiError};

/// GET /api/sites
pub async fn list_sites(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Site>>, ApiError> {
    require_local_inventory(&state)?;
    Ok(Json(state.store.list_sites().await?))
}

/// GET /api/sites/:slug
pub async fn get_site(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Site>, ApiError> {
    require_local_inventory(&state)?;
    let site = state
        .store
        .get_site_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("site"))?;
    Ok(Json(site))
}

/// POST /api/sites
pub async fn create_site(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSiteRequest>,
) -> Result<(StatusCode, Json<Site>), ApiError> {
    require_local_inventory(&state)?;
    if req.name.trim().is_empty() || req.slug.trim().is_empty() {
        return Err(ApiError::bad_request("name and slug are required"));
    }
    if state.store.get_site_by_slug(&req.slug).await?.is_some() {
        return Err(ApiError::conflict("site with this slug already exists"));
    }
    let site = state.store.create_site(&req).await?;
    tracing::info!("Created site {}", site.slug);
    Ok(created(site))
}

/// DELETE /api/sites/:slug
pub async fn delete_site(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_local_inventory(&state)?;
    let site = state
        .store
        .get_site_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("site"))?;
    state.store.delete_site(site.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
