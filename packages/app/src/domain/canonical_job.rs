use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::Id;
use crate::domain::raw_job::RawJobId;
use crate::domain::types::{JobStatus, PostedAtConfidence, ScoreBand, TitleBucket, WorkMode};

pub struct CanonicalJobMarker;
pub type CanonicalJobId = Id<CanonicalJobMarker>;

/// Normalized, scored, deduplicated job — the single authoritative record
/// for a unique posting.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CanonicalJob {
    pub id: CanonicalJobId,
    pub raw_job_id: Option<RawJobId>,

    pub source: String,
    pub title: String,
    pub company: String,
    pub url: String,

    pub url_hash: String,
    pub content_fingerprint: String,

    pub city: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub location_tier: Option<String>,
    #[sqlx(try_from = "String")]
    pub work_mode: WorkMode,
    #[sqlx(try_from = "String")]
    pub title_bucket: TitleBucket,

    pub score: i32,
    pub score_freshness: i32,
    pub score_location: i32,
    pub score_mode: i32,
    #[sqlx(try_from = "String")]
    pub score_band: ScoreBand,

    pub posted_at: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub posted_at_confidence: PostedAtConfidence,
    pub first_seen_at: DateTime<Utc>,

    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub is_backfill: bool,
    pub is_reposted: bool,
    pub is_potential_duplicate: bool,
    pub original_post_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<String> for WorkMode {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl TryFrom<String> for TitleBucket {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl TryFrom<String> for ScoreBand {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl TryFrom<String> for PostedAtConfidence {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl TryFrom<String> for JobStatus {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl CanonicalJob {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        raw_job_id: Option<RawJobId>,
        source: impl Into<String>,
        title: impl Into<String>,
        company: impl Into<String>,
        url: impl Into<String>,
        url_hash: impl Into<String>,
        content_fingerprint: impl Into<String>,
        work_mode: WorkMode,
        title_bucket: TitleBucket,
        posted_at_confidence: PostedAtConfidence,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CanonicalJobId::new(),
            raw_job_id,
            source: source.into(),
            title: title.into(),
            company: company.into(),
            url: url.into(),
            url_hash: url_hash.into(),
            content_fingerprint: content_fingerprint.into(),
            city: None,
            province: None,
            country: None,
            location_tier: None,
            work_mode,
            title_bucket,
            score: 0,
            score_freshness: 0,
            score_location: 0,
            score_mode: 0,
            score_band: ScoreBand::WorthALook,
            posted_at: None,
            posted_at_confidence,
            first_seen_at: now,
            status: JobStatus::Active,
            is_backfill: false,
            is_reposted: false,
            is_potential_duplicate: false,
            original_post_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<CanonicalJobId> {
        sqlx::query_scalar::<_, CanonicalJobId>(
            "INSERT INTO jobs_canonical
                (id, raw_job_id, source, title, company, url, url_hash, content_fingerprint,
                 city, province, country, location_tier, work_mode, title_bucket,
                 score, score_freshness, score_location, score_mode, score_band,
                 posted_at, posted_at_confidence, first_seen_at,
                 status, is_backfill, is_reposted, is_potential_duplicate, original_post_date,
                 created_at, updated_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,
                     $20,$21,$22,$23,$24,$25,$26,$27,$28,$29)
             RETURNING id",
        )
        .bind(self.id)
        .bind(self.raw_job_id)
        .bind(&self.source)
        .bind(&self.title)
        .bind(&self.company)
        .bind(&self.url)
        .bind(&self.url_hash)
        .bind(&self.content_fingerprint)
        .bind(&self.city)
        .bind(&self.province)
        .bind(&self.country)
        .bind(&self.location_tier)
        .bind(self.work_mode.to_string())
        .bind(self.title_bucket.to_string())
        .bind(self.score)
        .bind(self.score_freshness)
        .bind(self.score_location)
        .bind(self.score_mode)
        .bind(self.score_band.to_string())
        .bind(self.posted_at)
        .bind(self.posted_at_confidence.to_string())
        .bind(self.first_seen_at)
        .bind(self.status.to_string())
        .bind(self.is_backfill)
        .bind(self.is_reposted)
        .bind(self.is_potential_duplicate)
        .bind(self.original_post_date)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await
        .context("inserting canonical job")
    }

    pub async fn find_by_id(id: CanonicalJobId, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, CanonicalJob>("SELECT * FROM jobs_canonical WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .context("loading canonical job by id")
    }

    pub async fn find_by_url_hash(url_hash: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, CanonicalJob>("SELECT * FROM jobs_canonical WHERE url_hash = $1")
            .bind(url_hash)
            .fetch_optional(pool)
            .await
            .context("looking up canonical job by url hash")
    }

    /// Active jobs with a matching content fingerprint, oldest first — used
    /// by the repost-detection pass.
    pub async fn find_by_content_fingerprint_active(
        content_fingerprint: &str,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, CanonicalJob>(
            "SELECT * FROM jobs_canonical
             WHERE content_fingerprint = $1 AND status = 'active'
             ORDER BY first_seen_at ASC",
        )
        .bind(content_fingerprint)
        .fetch_all(pool)
        .await
        .context("looking up canonical jobs by content fingerprint")
    }

    /// Active jobs first seen within the last `days` days — the fuzzy-dedup
    /// index source.
    pub async fn find_recent_active(days: i64, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, CanonicalJob>(
            "SELECT * FROM jobs_canonical
             WHERE status = 'active' AND first_seen_at >= now() - ($1 || ' days')::interval",
        )
        .bind(days.to_string())
        .fetch_all(pool)
        .await
        .context("loading recent active canonical jobs")
    }

    pub async fn list(
        limit: i64,
        offset: i64,
        band: Option<&str>,
        bucket: Option<&str>,
        status: Option<&str>,
        since: Option<DateTime<Utc>>,
        min_score: Option<i32>,
        tiers: Option<&[String]>,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, CanonicalJob>(
            "SELECT * FROM jobs_canonical
             WHERE ($1::text IS NULL OR score_band = $1)
               AND ($2::text IS NULL OR title_bucket = $2)
               AND ($3::text IS NULL OR status = $3)
               AND ($4::timestamptz IS NULL OR first_seen_at >= $4)
               AND ($5::int IS NULL OR score >= $5)
               AND ($6::text[] IS NULL OR location_tier = ANY($6))
             ORDER BY score DESC, first_seen_at DESC
             LIMIT $7 OFFSET $8",
        )
        .bind(band)
        .bind(bucket)
        .bind(status)
        .bind(since)
        .bind(min_score)
        .bind(tiers)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("listing canonical jobs")
    }

    pub async fn update_score(
        id: CanonicalJobId,
        score: i32,
        score_freshness: i32,
        score_location: i32,
        score_mode: i32,
        score_band: ScoreBand,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE jobs_canonical
             SET score = $2, score_freshness = $3, score_location = $4, score_mode = $5,
                 score_band = $6, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(score)
        .bind(score_freshness)
        .bind(score_location)
        .bind(score_mode)
        .bind(score_band.to_string())
        .execute(pool)
        .await
        .context("updating canonical job score")?;
        Ok(())
    }

    /// Monotone status transition: `active -> {applied|dismissed|expired|archived}`.
    pub async fn update_status(id: CanonicalJobId, status: JobStatus, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE jobs_canonical SET status = $2, updated_at = now()
             WHERE id = $1 AND status = 'active'",
        )
        .bind(id)
        .bind(status.to_string())
        .execute(pool)
        .await
        .context("updating canonical job status")?;
        Ok(())
    }

    /// All active jobs, for the expired-link sweep (`cleanup-expired`) and
    /// the weekly catch-up HEAD/GET pass. No status/date filter beyond
    /// `active` since the sweep is meant to cover everything still live.
    pub async fn find_all_active(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, CanonicalJob>("SELECT * FROM jobs_canonical WHERE status = 'active' ORDER BY first_seen_at ASC")
            .fetch_all(pool)
            .await
            .context("loading all active canonical jobs")
    }

    pub async fn archive_stale(older_than_days: i64, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE jobs_canonical
             SET status = 'archived', updated_at = now()
             WHERE status = 'active' AND first_seen_at < now() - ($1 || ' days')::interval",
        )
        .bind(older_than_days.to_string())
        .execute(pool)
        .await
        .context("archiving stale canonical jobs")?;
        Ok(result.rows_affected())
    }
}
