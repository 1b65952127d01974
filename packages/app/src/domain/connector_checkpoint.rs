use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Per-`(source, company)` success/failure counters, used to decide when a
/// connector's repeated failures cross an alerting threshold.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConnectorCheckpoint {
    pub source: String,
    pub company: String,
    pub consecutive_failures: i32,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl ConnectorCheckpoint {
    /// Records a success, resetting the consecutive-failure counter. Returns
    /// the counter's new value (0).
    pub async fn record_success(source: &str, company: &str, pool: &PgPool) -> Result<i32> {
        sqlx::query(
            "INSERT INTO connector_checkpoints (source, company, consecutive_failures, last_success_at)
             VALUES ($1, $2, 0, now())
             ON CONFLICT (source, company) DO UPDATE SET
                consecutive_failures = 0,
                last_success_at = now()",
        )
        .bind(source)
        .bind(company)
        .execute(pool)
        .await
        .context("recording connector success")?;
        Ok(0)
    }

    /// Records a failure, incrementing the consecutive-failure counter.
    /// Returns the counter's new value so the caller can decide whether to
    /// alert (every multiple of 3).
    pub async fn record_failure(source: &str, company: &str, pool: &PgPool) -> Result<i32> {
        let row: (i32,) = sqlx::query_as(
            "INSERT INTO connector_checkpoints (source, company, consecutive_failures, last_failure_at)
             VALUES ($1, $2, 1, now())
             ON CONFLICT (source, company) DO UPDATE SET
                consecutive_failures = connector_checkpoints.consecutive_failures + 1,
                last_failure_at = now()
             RETURNING consecutive_failures",
        )
        .bind(source)
        .bind(company)
        .fetch_one(pool)
        .await
        .context("recording connector failure")?;
        Ok(row.0)
    }
}
