use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::*;
use crate::onboarding::StoreError;

use super::row_helpers::map_task_row;

const SELECT_TASK: &str = r#"
    SELECT id, target, ip_address, site, platform, device_type, role, port, timeout,
           stack_separator, status, failed_reason, message, created_device_id,
           requested_by, created_at, started_at, completed_at
    FROM onboarding_tasks
"#;

const SEARCH_COLUMNS: usize = 8;
const SEARCH_CLAUSE: &str = r#"(
    id LIKE ? ESCAPE '\' OR target LIKE ? ESCAPE '\' OR ip_address LIKE ? ESCAPE '\'
    OR site LIKE ? ESCAPE '\' OR platform LIKE ? ESCAPE '\' OR status LIKE ? ESCAPE '\'
    OR failed_reason LIKE ? ESCAPE '\' OR message LIKE ? ESCAPE '\'
)"#;

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1000;

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Onboarding task database operations
pub struct TaskRepo;

impl TaskRepo {
    /// Newest first. Exact-match filters compare case-insensitively; `q`
    /// is a substring match across the searchable columns.
    pub async fn list_filtered(pool: &Pool<Sqlite>, filter: &TaskFilter) -> Result<Vec<OnboardingTask>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        let exact = [
            ("site = ? COLLATE NOCASE", &filter.site),
            ("platform = ? COLLATE NOCASE", &filter.platform),
            ("role = ? COLLATE NOCASE", &filter.role),
            ("status = ? COLLATE NOCASE", &filter.status),
            ("failed_reason = ? COLLATE NOCASE", &filter.failed_reason),
            ("requested_by = ?", &filter.requested_by),
        ];
        for (clause, value) in exact {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                clauses.push(clause);
                binds.push(v.to_string());
            }
        }

        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            clauses.push(SEARCH_CLAUSE);
            let pattern = format!("%{}%", escape_like(q));
            binds.extend(std::iter::repeat(pattern).take(SEARCH_COLUMNS));
        }

        let mut sql = SELECT_TASK.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut query = sqlx::query(&sql);
        for value in &binds {
            query = query.bind(value.as_str());
        }
        let rows = query
            .bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_task_row).collect())
    }

    pub async fn list_pending(pool: &Pool<Sqlite>) -> Result<Vec<OnboardingTask>> {
        let rows = sqlx::query(&format!("{} WHERE status = ? ORDER BY created_at", SELECT_TASK))
            .bind(task_status::PENDING)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_task_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: &str) -> Result<Option<OnboardingTask>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_TASK))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_task_row))
    }

    pub async fn create(pool: &Pool<Sqlite>, id: &str, req: &OnboardingRequest) -> Result<OnboardingTask> {
        sqlx::query(
            r#"
            INSERT INTO onboarding_tasks (id, target, site, platform, device_type, role, port,
                                          timeout, stack_separator, status, message,
                                          requested_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '', ?, ?)
            "#,
        )
        .bind(id)
        .bind(&req.target)
        .bind(&req.site)
        .bind(&req.platform)
        .bind(&req.device_type)
        .bind(&req.role)
        .bind(i64::from(req.port))
        .bind(req.timeout as i64)
        .bind(req.stack_separator.map(String::from))
        .bind(task_status::PENDING)
        .bind(&req.requested_by)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Self::get(pool, id)
            .await?
            .context("Onboarding task not found after creation")
    }

    pub async fn mark_started(pool: &Pool<Sqlite>, id: &str, ip_address: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE onboarding_tasks SET ip_address = ?, started_at = ? WHERE id = ? AND status = ?",
        )
        .bind(ip_address)
        .bind(Utc::now())
        .bind(id)
        .bind(task_status::PENDING)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotPending(id.to_string()).into());
        }
        Ok(())
    }

    /// Record a terminal outcome. Only pending tasks transition.
    /// `device_id` never clears a device recorded earlier.
    pub async fn finish(
        pool: &Pool<Sqlite>,
        id: &str,
        status: &str,
        failed_reason: Option<&str>,
        message: &str,
        device_id: Option<i64>,
    ) -> Result<OnboardingTask> {
        let result = sqlx::query(
            r#"
            UPDATE onboarding_tasks
            SET status = ?, failed_reason = ?, message = ?,
                created_device_id = COALESCE(?, created_device_id), completed_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(status)
        .bind(failed_reason)
        .bind(message)
        .bind(device_id)
        .bind(Utc::now())
        .bind(id)
        .bind(task_status::PENDING)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotPending(id.to_string()).into());
        }

        Self::get(pool, id)
            .await?
            .context("Onboarding task not found after update")
    }
}
