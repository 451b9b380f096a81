use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::map_onboarding_device_row;

/// Latest-task columns are correlated subqueries over the tasks linked to
/// the device. Skipped tasks carry no device link and so never count.
const SELECT_ONBOARDING_DEVICE: &str = r#"
    SELECT d.device_id, d.enabled,
           (SELECT t.created_at FROM onboarding_tasks t WHERE t.created_device_id = d.device_id
            ORDER BY t.created_at DESC, t.rowid DESC LIMIT 1) AS last_attempt,
           (SELECT t.created_at FROM onboarding_tasks t WHERE t.created_device_id = d.device_id
            AND t.status = 'succeeded' ORDER BY t.created_at DESC, t.rowid DESC LIMIT 1) AS last_success,
           (SELECT t.id FROM onboarding_tasks t WHERE t.created_device_id = d.device_id
            ORDER BY t.created_at DESC, t.rowid DESC LIMIT 1) AS last_task_id,
           (SELECT t.status FROM onboarding_tasks t WHERE t.created_device_id = d.device_id
            ORDER BY t.created_at DESC, t.rowid DESC LIMIT 1) AS last_status
    FROM onboarding_devices d
"#;

/// Per-device onboarding tracking
pub struct OnboardingDeviceRepo;

impl OnboardingDeviceRepo {
    pub async fn get(pool: &Pool<Sqlite>, device_id: i64) -> Result<Option<OnboardingDevice>> {
        let row = sqlx::query(&format!("{} WHERE d.device_id = ?", SELECT_ONBOARDING_DEVICE))
            .bind(device_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_onboarding_device_row))
    }

    /// Devices without a tracking row are enabled
    pub async fn is_enabled(pool: &Pool<Sqlite>, device_id: i64) -> Result<bool> {
        let enabled: Option<(bool,)> =
            sqlx::query_as("SELECT enabled FROM onboarding_devices WHERE device_id = ?")
                .bind(device_id)
                .fetch_optional(pool)
                .await?;
        Ok(enabled.map_or(true, |(e,)| e))
    }

    /// Create the tracking row if missing; an existing row keeps its switch
    pub async fn ensure(pool: &Pool<Sqlite>, device_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO onboarding_devices (device_id, enabled) VALUES (?, 1)")
            .bind(device_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_enabled(pool: &Pool<Sqlite>, device_id: i64, enabled: bool) -> Result<OnboardingDevice> {
        sqlx::query(
            r#"
            INSERT INTO onboarding_devices (device_id, enabled, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(device_id) DO UPDATE SET enabled = excluded.enabled, updated_at = excluded.updated_at
            "#,
        )
        .bind(device_id)
        .bind(enabled)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Self::get(pool, device_id)
            .await?
            .context("Onboarding device not found after update")
    }

    pub async fn delete(pool: &Pool<Sqlite>, device_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM onboarding_devices WHERE device_id = ?")
            .bind(device_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
