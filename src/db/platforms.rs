use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};

use crate::models::*;
use crate::onboarding::Lookup;

use super::row_helpers::{lookup_clause, map_platform_row};

const SELECT_PLATFORM: &str = "SELECT id, name, slug, driver FROM platforms";

/// Platform database operations
pub struct PlatformRepo;

impl PlatformRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<Platform>> {
        let rows = sqlx::query(&format!("{} ORDER BY slug", SELECT_PLATFORM))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_platform_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Platform>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_PLATFORM))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_platform_row))
    }

    pub async fn find(pool: &Pool<Sqlite>, lookup: &Lookup) -> Result<Vec<Platform>> {
        let rows = sqlx::query(&format!(
            "{} WHERE {} ORDER BY id",
            SELECT_PLATFORM,
            lookup_clause(lookup)
        ))
        .bind(lookup.value())
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_platform_row).collect())
    }

    pub async fn create(pool: &Pool<Sqlite>, req: &CreatePlatformRequest) -> Result<Platform> {
        let result = sqlx::query("INSERT INTO platforms (name, slug, driver) VALUES (?, ?, ?)")
            .bind(&req.name)
            .bind(&req.slug)
            .bind(&req.driver)
            .execute(pool)
            .await?;

        Self::get(pool, result.last_insert_rowid())
            .await?
            .context("Platform not found after creation")
    }
}
