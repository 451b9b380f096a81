use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::map_site_row;

const SELECT_SITE: &str = "SELECT id, name, slug, description FROM sites";

/// Site database operations
pub struct SiteRepo;

impl SiteRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<Site>> {
        let rows = sqlx::query(&format!("{} ORDER BY slug", SELECT_SITE))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_site_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Site>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_SITE))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_site_row))
    }

    pub async fn get_by_slug(pool: &Pool<Sqlite>, slug: &str) -> Result<Option<Site>> {
        let row = sqlx::query(&format!("{} WHERE slug = ?", SELECT_SITE))
            .bind(slug)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_site_row))
    }

    pub async fn create(pool: &Pool<Sqlite>, req: &CreateSiteRequest) -> Result<Site> {
        let result = sqlx::query("INSERT INTO sites (name, slug, description) VALUES (?, ?, ?)")
            .bind(&req.name)
            .bind(&req.slug)
            .bind(&req.description)
            .execute(pool)
            .await?;

        Self::get(pool, result.last_insert_rowid())
            .await?
            .context("Site not found after creation")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM sites WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Site", &id.to_string()).into());
        }
        Ok(())
    }
}
