use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};

use crate::models::*;
use crate::onboarding::Lookup;

use super::row_helpers::{lookup_clause, map_device_type_row};

const SELECT_DEVICE_TYPE: &str =
    "SELECT id, manufacturer_id, model, slug, part_number FROM device_types";

/// Device type database operations
pub struct DeviceTypeRepo;

impl DeviceTypeRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<DeviceType>> {
        let rows = sqlx::query(&format!("{} ORDER BY slug", SELECT_DEVICE_TYPE))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_device_type_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<DeviceType>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_DEVICE_TYPE))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_device_type_row))
    }

    pub async fn find(pool: &Pool<Sqlite>, lookup: &Lookup) -> Result<Vec<DeviceType>> {
        let rows = sqlx::query(&format!(
            "{} WHERE {} ORDER BY id",
            SELECT_DEVICE_TYPE,
            lookup_clause(lookup)
        ))
        .bind(lookup.value())
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_device_type_row).collect())
    }

    pub async fn create(pool: &Pool<Sqlite>, req: &CreateDeviceTypeRequest) -> Result<DeviceType> {
        let result = sqlx::query(
            "INSERT INTO device_types (manufacturer_id, model, slug, part_number) VALUES (?, ?, ?, ?)",
        )
        .bind(req.manufacturer_id)
        .bind(&req.model)
        .bind(&req.slug)
        .bind(&req.part_number)
        .execute(pool)
        .await?;

        Self::get(pool, result.last_insert_rowid())
            .await?
            .context("Device type not found after creation")
    }
}
