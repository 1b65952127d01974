use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::Id;

pub struct RawJobMarker;
pub type RawJobId = Id<RawJobMarker>;

/// Untransformed capture from a source connector.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RawJob {
    pub id: RawJobId,
    pub source: String,
    pub source_job_id: String,
    pub title: String,
    pub company: String,
    pub url: String,
    pub location_raw: String,
    pub content: String,
    pub posted_at: Option<DateTime<Utc>>,
    /// Textual posting-date hint (a relative phrase like `"3 days ago"`, or
    /// a short date) for sources that don't expose a structured timestamp.
    /// The normalizer parses this when `posted_at` itself is absent.
    pub posted_at_raw: Option<String>,
    pub raw_payload: Option<serde_json::Value>,
    pub fetched_at: DateTime<Utc>,
}

impl RawJob {
    pub fn new(
        source: impl Into<String>,
        source_job_id: impl Into<String>,
        title: impl Into<String>,
        company: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: RawJobId::new(),
            source: source.into(),
            source_job_id: source_job_id.into(),
            title: title.into(),
            company: company.into(),
            url: url.into(),
            location_raw: String::new(),
            content: String::new(),
            posted_at: None,
            posted_at_raw: None,
            raw_payload: None,
            fetched_at: Utc::now(),
        }
    }

    pub fn with_location_raw(mut self, location_raw: impl Into<String>) -> Self {
        self.location_raw = location_raw.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_posted_at(mut self, posted_at: Option<DateTime<Utc>>) -> Self {
        self.posted_at = posted_at;
        self
    }

    pub fn with_posted_at_raw(mut self, posted_at_raw: impl Into<String>) -> Self {
        self.posted_at_raw = Some(posted_at_raw.into());
        self
    }

    pub fn with_raw_payload(mut self, raw_payload: serde_json::Value) -> Self {
        self.raw_payload = Some(raw_payload);
        self
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<RawJobId> {
        sqlx::query_scalar::<_, RawJobId>(
            "INSERT INTO jobs_raw
                (id, source, source_job_id, title, company, url, location_raw,
                 content, posted_at, posted_at_raw, raw_payload, fetched_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING id",
        )
        .bind(self.id)
        .bind(&self.source)
        .bind(&self.source_job_id)
        .bind(&self.title)
        .bind(&self.company)
        .bind(&self.url)
        .bind(&self.location_raw)
        .bind(&self.content)
        .bind(self.posted_at)
        .bind(&self.posted_at_raw)
        .bind(&self.raw_payload)
        .bind(self.fetched_at)
        .fetch_one(pool)
        .await
        .context("inserting raw job")
    }

    pub async fn find_by_source_and_date(
        source: &str,
        date: chrono::NaiveDate,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end = start + chrono::Duration::days(1);
        sqlx::query_as::<_, RawJob>(
            "SELECT * FROM jobs_raw
             WHERE source = $1 AND fetched_at >= $2 AND fetched_at < $3
             ORDER BY fetched_at ASC",
        )
        .bind(source)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
        .context("loading raw jobs by source and date")
    }

    pub async fn purge_older_than(days: i64, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query("DELETE FROM jobs_raw WHERE fetched_at < now() - ($1 || ' days')::interval")
            .bind(days.to_string())
            .execute(pool)
            .await
            .context("purging old raw jobs")?;
        Ok(result.rows_affected())
    }
}
