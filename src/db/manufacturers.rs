use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};

use crate::models::*;
use crate::onboarding::Lookup;

use super::row_helpers::{lookup_clause, map_manufacturer_row};

const SELECT_MANUFACTURER: &str = "SELECT id, name, slug FROM manufacturers";

/// Manufacturer database operations
pub struct ManufacturerRepo;

impl ManufacturerRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<Manufacturer>> {
        let rows = sqlx::query(&format!("{} ORDER BY slug", SELECT_MANUFACTURER))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_manufacturer_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Manufacturer>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_MANUFACTURER))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_manufacturer_row))
    }

    pub async fn find(pool: &Pool<Sqlite>, lookup: &Lookup) -> Result<Vec<Manufacturer>> {
        let rows = sqlx::query(&format!(
            "{} WHERE {} ORDER BY id",
            SELECT_MANUFACTURER,
            lookup_clause(lookup)
        ))
        .bind(lookup.value())
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_manufacturer_row).collect())
    }

    pub async fn create(pool: &Pool<Sqlite>, req: &CreateManufacturerRequest) -> Result<Manufacturer> {
        let result = sqlx::query("INSERT INTO manufacturers (name, slug) VALUES (?, ?)")
            .bind(&req.name)
            .bind(&req.slug)
            .execute(pool)
            .await?;

        Self::get(pool, result.last_insert_rowid())
            .await?
            .context("Manufacturer not found after creation")
    }
}
