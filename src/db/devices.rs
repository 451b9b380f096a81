use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::map_device_row;

const SELECT_DEVICE: &str = r#"
    SELECT d.id, d.name, d.site_id, d.role_id, d.device_type_id, d.manufacturer_id,
           d.platform_id, d.serial, d.status, d.primary_ip_id, ip.address AS primary_ip
    FROM devices d
    LEFT JOIN ip_addresses ip ON ip.id = d.primary_ip_id
"#;

/// Device database operations
pub struct DeviceRepo;

impl DeviceRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<Device>> {
        let rows = sqlx::query(&format!("{} ORDER BY d.name", SELECT_DEVICE))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_device_row).collect())
    }

    pub async fn list_paged(pool: &Pool<Sqlite>, limit: i64, offset: i64) -> Result<Vec<Device>> {
        let rows = sqlx::query(&format!("{} ORDER BY d.name LIMIT ? OFFSET ?", SELECT_DEVICE))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_device_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Device>> {
        let row = sqlx::query(&format!("{} WHERE d.id = ?", SELECT_DEVICE))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_device_row))
    }

    pub async fn find_by_name(pool: &Pool<Sqlite>, name: &str) -> Result<Vec<Device>> {
        let rows = sqlx::query(&format!("{} WHERE d.name = ? ORDER BY d.id", SELECT_DEVICE))
            .bind(name)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_device_row).collect())
    }

    /// Devices whose primary IP record has the given host address
    pub async fn find_by_primary_ip(pool: &Pool<Sqlite>, host: &str) -> Result<Vec<Device>> {
        let rows = sqlx::query(&format!("{} WHERE ip.host = ? ORDER BY d.id", SELECT_DEVICE))
            .bind(host)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_device_row).collect())
    }

    pub async fn create(pool: &Pool<Sqlite>, req: &CreateDeviceRequest) -> Result<Device> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO devices (name, site_id, role_id, device_type_id, manufacturer_id,
                                 platform_id, serial, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&req.name)
        .bind(req.site_id)
        .bind(req.role_id)
        .bind(req.device_type_id)
        .bind(req.manufacturer_id)
        .bind(req.platform_id)
        .bind(&req.serial)
        .bind(&req.status)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Self::get(pool, result.last_insert_rowid())
            .await?
            .context("Device not found after creation")
    }

    pub async fn update(pool: &Pool<Sqlite>, id: i64, req: &UpdateDeviceRequest) -> Result<Device> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE devices SET
                name = COALESCE(?, name),
                site_id = COALESCE(?, site_id),
                role_id = COALESCE(?, role_id),
                device_type_id = COALESCE(?, device_type_id),
                manufacturer_id = COALESCE(?, manufacturer_id),
                platform_id = COALESCE(?, platform_id),
                serial = COALESCE(?, serial),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&req.name)
        .bind(req.site_id)
        .bind(req.role_id)
        .bind(req.device_type_id)
        .bind(req.manufacturer_id)
        .bind(req.platform_id)
        .bind(&req.serial)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Device", &id.to_string()).into());
        }

        Self::get(pool, id)
            .await?
            .context("Device not found after update")
    }

    pub async fn set_primary_ip(pool: &Pool<Sqlite>, id: i64, ip_id: i64) -> Result<Device> {
        let result = sqlx::query("UPDATE devices SET primary_ip_id = ?, updated_at = ? WHERE id = ?")
            .bind(ip_id)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Device", &id.to_string()).into());
        }

        Self::get(pool, id)
            .await?
            .context("Device not found after update")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Device", &id.to_string()).into());
        }
        Ok(())
    }
}
