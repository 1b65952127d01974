use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::Id;

pub struct RunLogMarker;
pub type RunLogId = Id<RunLogMarker>;

/// One row per pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RunLog {
    pub id: RunLogId,
    pub run_type: String,
    pub is_dry_run: bool,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub jobs_found: i32,
    pub jobs_new: i32,
    pub jobs_duplicate: i32,
    pub jobs_rejected: i32,
    pub alerts_sent: i32,
    pub errors: serde_json::Value,
}

impl RunLog {
    pub async fn create(run_type: &str, is_dry_run: bool, pool: &PgPool) -> Result<RunLogId> {
        sqlx::query_scalar::<_, RunLogId>(
            "INSERT INTO run_logs (id, run_type, is_dry_run, status, started_at, errors)
             VALUES ($1, $2, $3, 'running', now(), '[]')
             RETURNING id",
        )
        .bind(RunLogId::new())
        .bind(run_type)
        .bind(is_dry_run)
        .fetch_one(pool)
        .await
        .context("creating run log")
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn finish(
        id: RunLogId,
        status: &str,
        jobs_found: i32,
        jobs_new: i32,
        jobs_duplicate: i32,
        jobs_rejected: i32,
        alerts_sent: i32,
        errors: &[String],
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE run_logs
             SET status = $2, finished_at = now(), jobs_found = $3, jobs_new = $4,
                 jobs_duplicate = $5, jobs_rejected = $6, alerts_sent = $7, errors = $8
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(jobs_found)
        .bind(jobs_new)
        .bind(jobs_duplicate)
        .bind(jobs_rejected)
        .bind(alerts_sent)
        .bind(serde_json::to_value(errors)?)
        .execute(pool)
        .await
        .context("finishing run log")?;
        Ok(())
    }

    pub async fn most_recent_completed(pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, RunLog>(
            "SELECT * FROM run_logs WHERE status = 'completed'
             ORDER BY finished_at DESC LIMIT 1",
        )
        .fetch_optional(pool)
        .await
        .context("loading most recent completed run")
    }

    pub async fn recent(limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, RunLog>("SELECT * FROM run_logs ORDER BY started_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(pool)
            .await
            .context("loading recent run logs")
    }
}
