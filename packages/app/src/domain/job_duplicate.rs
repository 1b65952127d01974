use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::Id;
use crate::domain::canonical_job::CanonicalJobId;
use crate::domain::types::DedupMethod;

pub struct JobDuplicateMarker;
pub type JobDuplicateId = Id<JobDuplicateMarker>;

/// Edge recorded whenever a new job is linked to an existing one by the
/// dedup engine, including potential (below-certainty) matches.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobDuplicate {
    pub id: JobDuplicateId,
    pub new_job_id: CanonicalJobId,
    pub existing_job_id: CanonicalJobId,
    #[sqlx(try_from = "String")]
    pub method: DedupMethod,
    pub similarity: f32,
    pub is_potential: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<String> for DedupMethod {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl JobDuplicate {
    pub async fn insert(
        new_job_id: CanonicalJobId,
        existing_job_id: CanonicalJobId,
        method: DedupMethod,
        similarity: f32,
        is_potential: bool,
        pool: &PgPool,
    ) -> Result<JobDuplicateId> {
        sqlx::query_scalar::<_, JobDuplicateId>(
            "INSERT INTO job_duplicates
                (id, new_job_id, existing_job_id, method, similarity, is_potential, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, now())
             RETURNING id",
        )
        .bind(JobDuplicateId::new())
        .bind(new_job_id)
        .bind(existing_job_id)
        .bind(method.to_string())
        .bind(similarity)
        .bind(is_potential)
        .fetch_one(pool)
        .await
        .context("inserting job duplicate link")
    }
}
