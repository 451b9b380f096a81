use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::config::InventoryBackend;
use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

/// Inventory browsing only covers the local store
pub(crate) fn require_local_inventory(state: &AppState) -> Result<(), ApiError> {
    if state.config.inventory_backend == InventoryBackend::NetBox {
        return Err(ApiError::bad_request("inventory is managed in NetBox"));
    }
    Ok(())
}

fn require_name_and_slug(name: &str, slug: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() || slug.trim().is_empty() {
        return Err(ApiError::bad_request("name and slug are required"));
    }
    if crate::utils::slugify(slug) != slug {
        return Err(ApiError::bad_request(
            "slug may only contain lowercase letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

/// GET /api/manufacturers
pub async fn list_manufacturers(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Manufacturer>>, ApiError> {
    require_local_inventory(&state)?;
    Ok(Json(state.store.list_manufacturers().await?))
}

/// GET /api/platforms
pub async fn list_platforms(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Platform>>, ApiError> {
    require_local_inventory(&state)?;
    Ok(Json(state.store.list_platforms().await?))
}

/// POST /api/platforms
pub async fn create_platform(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePlatformRequest>,
) -> Result<(StatusCode, Json<Platform>), ApiError> {
    require_local_inventory(&state)?;
    require_name_and_slug(&req.name, &req.slug)?;
    if !req.driver.is_empty() && state.drivers.get(&req.driver).is_none() {
        return Err(ApiError::bad_request(format!(
            "unknown driver '{}', expected one of: {}",
            req.driver,
            state.drivers.platforms().join(", ")
        )));
    }
    let platform = state.store.create_platform(&req).await?;
    tracing::info!("Created platform {} (driver '{}')", platform.slug, platform.driver);
    Ok(created(platform))
}

/// GET /api/device-types
pub async fn list_device_types(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DeviceType>>, ApiError> {
    require_local_inventory(&state)?;
    Ok(Json(state.store.list_device_types().await?))
}

/// GET /api/device-roles
pub async fn list_device_roles(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DeviceRole>>, ApiError> {
    require_local_inventory(&state)?;
    Ok(Json(state.store.list_device_roles().await?))
}

/// POST /api/device-roles
pub async fn create_device_role(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<CreateDeviceRoleRequest>,
) -> Result<(StatusCode, Json<DeviceRole>), ApiError> {
    require_local_inventory(&state)?;
    require_name_and_slug(&req.name, &req.slug)?;
    req.color = req.color.to_lowercase();
    if req.color.len() != 6 || !req.color.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ApiError::bad_request("color must be 6 hex digits"));
    }
    let role = state.store.create_device_role(&req).await?;
    Ok(created(role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_validation() {
        assert!(require_name_and_slug("Cisco IOS", "cisco_ios").is_ok());
        assert!(require_name_and_slug("Cisco IOS", "Cisco IOS").is_err());
        assert!(require_name_and_slug("", "ios").is_err());
    }
}
