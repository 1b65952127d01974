use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::Id;
use crate::domain::canonical_job::CanonicalJobId;

pub struct AlternateUrlMarker;
pub type AlternateUrlId = Id<AlternateUrlMarker>;

/// A secondary URL for a canonical job surfaced by some other source.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AlternateUrl {
    pub id: AlternateUrlId,
    pub canonical_job_id: CanonicalJobId,
    pub source: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl AlternateUrl {
    /// Best-effort insert; a conflicting `(canonical_job_id, source)` pair is
    /// silently ignored.
    pub async fn insert_ignore_conflict(
        canonical_job_id: CanonicalJobId,
        source: &str,
        url: &str,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO alternate_urls (id, canonical_job_id, source, url, created_at)
             VALUES ($1, $2, $3, $4, now())
             ON CONFLICT (canonical_job_id, source) DO NOTHING",
        )
        .bind(AlternateUrlId::new())
        .bind(canonical_job_id)
        .bind(source)
        .bind(url)
        .execute(pool)
        .await
        .context("inserting alternate url")?;
        Ok(())
    }

    pub async fn list_for_job(canonical_job_id: CanonicalJobId, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, AlternateUrl>(
            "SELECT * FROM alternate_urls
             WHERE canonical_job_id = $1
             ORDER BY created_at ASC
             LIMIT 5",
        )
        .bind(canonical_job_id)
        .fetch_all(pool)
        .await
        .context("listing alternate urls")
    }
}
