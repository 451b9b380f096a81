use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::{map_interface_row, map_ip_address_row};

/// Interface database operations
pub struct InterfaceRepo;

impl InterfaceRepo {
    pub async fn list_by_device(pool: &Pool<Sqlite>, device_id: i64) -> Result<Vec<Interface>> {
        let rows = sqlx::query("SELECT id, device_id, name FROM interfaces WHERE device_id = ? ORDER BY name")
            .bind(device_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_interface_row).collect())
    }

    pub async fn get_by_name(pool: &Pool<Sqlite>, device_id: i64, name: &str) -> Result<Option<Interface>> {
        let row = sqlx::query("SELECT id, device_id, name FROM interfaces WHERE device_id = ? AND name = ?")
            .bind(device_id)
            .bind(name)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_interface_row))
    }

    pub async fn get_or_create(pool: &Pool<Sqlite>, device_id: i64, name: &str) -> Result<Interface> {
        sqlx::query("INSERT OR IGNORE INTO interfaces (device_id, name) VALUES (?, ?)")
            .bind(device_id)
            .bind(name)
            .execute(pool)
            .await?;

        Self::get_by_name(pool, device_id, name)
            .await?
            .context("Interface not found after creation")
    }
}

/// IP address database operations
pub struct IpAddressRepo;

impl IpAddressRepo {
    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<IpAddress>> {
        let row = sqlx::query("SELECT id, address, host, interface_id FROM ip_addresses WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_ip_address_row))
    }

    pub async fn get_by_host(pool: &Pool<Sqlite>, host: &str) -> Result<Option<IpAddress>> {
        let row = sqlx::query("SELECT id, address, host, interface_id FROM ip_addresses WHERE host = ?")
            .bind(host)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_ip_address_row))
    }

    /// An existing record keeps its stored prefix length
    pub async fn get_or_create(pool: &Pool<Sqlite>, host: &str, prefix_length: u8) -> Result<IpAddress> {
        sqlx::query("INSERT OR IGNORE INTO ip_addresses (address, host) VALUES (?, ?)")
            .bind(format!("{}/{}", host, prefix_length))
            .bind(host)
            .execute(pool)
            .await?;

        Self::get_by_host(pool, host)
            .await?
            .context("IP address not found after creation")
    }

    pub async fn assign(pool: &Pool<Sqlite>, id: i64, interface_id: i64) -> Result<IpAddress> {
        let result = sqlx::query("UPDATE ip_addresses SET interface_id = ? WHERE id = ?")
            .bind(interface_id)
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("IP address", &id.to_string()).into());
        }

        Self::get(pool, id)
            .await?
            .context("IP address not found after update")
    }
}
