use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::Id;

pub struct RetryQueueItemMarker;
pub type RetryQueueItemId = Id<RetryQueueItemMarker>;

/// A notification that failed to send, queued for a later retry with
/// exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RetryQueueItem {
    pub id: RetryQueueItemId,
    pub message: String,
    pub bot_type: String,
    pub retry_count: i32,
    pub next_retry_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RetryQueueItem {
    pub async fn enqueue(message: &str, bot_type: &str, pool: &PgPool) -> Result<RetryQueueItemId> {
        sqlx::query_scalar::<_, RetryQueueItemId>(
            "INSERT INTO retry_queue (id, message, bot_type, retry_count, next_retry_at, created_at)
             VALUES ($1, $2, $3, 0, now(), now())
             RETURNING id",
        )
        .bind(RetryQueueItemId::new())
        .bind(message)
        .bind(bot_type)
        .fetch_one(pool)
        .await
        .context("enqueuing retry item")
    }

    pub async fn due(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, RetryQueueItem>(
            "SELECT * FROM retry_queue WHERE next_retry_at <= now() ORDER BY created_at ASC",
        )
        .fetch_all(pool)
        .await
        .context("loading due retry items")
    }

    /// Exponential backoff: `next_retry_at = now + 2^retry_count minutes`.
    pub async fn increment_retry(id: RetryQueueItemId, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE retry_queue
             SET retry_count = retry_count + 1,
                 next_retry_at = now() + (power(2, retry_count + 1) || ' minutes')::interval
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await
        .context("incrementing retry count")?;
        Ok(())
    }

    pub async fn remove(id: RetryQueueItemId, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM retry_queue WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("removing retry item")?;
        Ok(())
    }
}
