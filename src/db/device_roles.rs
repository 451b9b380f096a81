use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};

use crate::models::*;
use crate::onboarding::Lookup;

use super::row_helpers::{lookup_clause, map_device_role_row};

const SELECT_DEVICE_ROLE: &str = "SELECT id, name, slug, color FROM device_roles";

/// Device role database operations
pub struct DeviceRoleRepo;

impl DeviceRoleRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<DeviceRole>> {
        let rows = sqlx::query(&format!("{} ORDER BY slug", SELECT_DEVICE_ROLE))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_device_role_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<DeviceRole>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_DEVICE_ROLE))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_device_role_row))
    }

    pub async fn find(pool: &Pool<Sqlite>, lookup: &Lookup) -> Result<Vec<DeviceRole>> {
        let rows = sqlx::query(&format!(
            "{} WHERE {} ORDER BY id",
            SELECT_DEVICE_ROLE,
            lookup_clause(lookup)
        ))
        .bind(lookup.value())
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_device_role_row).collect())
    }

    pub async fn create(pool: &Pool<Sqlite>, req: &CreateDeviceRoleRequest) -> Result<DeviceRole> {
        let result = sqlx::query("INSERT INTO device_roles (name, slug, color) VALUES (?, ?, ?)")
            .bind(&req.name)
            .bind(&req.slug)
            .bind(&req.color)
            .execute(pool)
            .await?;

        Self::get(pool, result.last_insert_rowid())
            .await?
            .context("Device role not found after creation")
    }
}
