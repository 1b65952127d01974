use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::domain::canonical_job::CanonicalJobId;
use crate::domain::types::Verdict;

/// The LLM fit analyzer's verdict on one canonical job. At most one row per
/// job; a later analysis replaces the prior one.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FitAnalysis {
    pub canonical_job_id: CanonicalJobId,
    pub fit_score: i32,
    #[sqlx(try_from = "String")]
    pub verdict: Verdict,
    pub summary: String,
    pub strengths: serde_json::Value,
    pub gaps: serde_json::Value,
    pub matched_skills: serde_json::Value,
    pub missing_skills: serde_json::Value,
    pub bonus_skills: serde_json::Value,
    pub tailoring_tips: serde_json::Value,
    pub cover_letter_points: serde_json::Value,
    pub experience_level_match: String,
    pub domain_relevance: String,
    pub recommendation: String,
    pub provider: String,
    pub model_used: String,
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<String> for Verdict {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl FitAnalysis {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        canonical_job_id: CanonicalJobId,
        fit_score: i32,
        verdict: Verdict,
        summary: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            canonical_job_id,
            fit_score,
            verdict,
            summary: summary.into(),
            strengths: serde_json::json!([]),
            gaps: serde_json::json!([]),
            matched_skills: serde_json::json!([]),
            missing_skills: serde_json::json!([]),
            bonus_skills: serde_json::json!([]),
            tailoring_tips: serde_json::json!([]),
            cover_letter_points: serde_json::json!([]),
            experience_level_match: "unknown".to_string(),
            domain_relevance: String::new(),
            recommendation: String::new(),
            provider: provider.into(),
            model_used: model_used.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
            created_at: Utc::now(),
        }
    }

    /// Insert-or-replace: a canonical job gets at most one analysis row.
    pub async fn upsert(&self, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "INSERT INTO fit_analyses
                (canonical_job_id, fit_score, verdict, summary, strengths, gaps,
                 matched_skills, missing_skills, bonus_skills, tailoring_tips,
                 cover_letter_points, experience_level_match, domain_relevance,
                 recommendation, provider, model_used, prompt_tokens, completion_tokens,
                 created_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19)
             ON CONFLICT (canonical_job_id) DO UPDATE SET
                fit_score = EXCLUDED.fit_score,
                verdict = EXCLUDED.verdict,
                summary = EXCLUDED.summary,
                strengths = EXCLUDED.strengths,
                gaps = EXCLUDED.gaps,
                matched_skills = EXCLUDED.matched_skills,
                missing_skills = EXCLUDED.missing_skills,
                bonus_skills = EXCLUDED.bonus_skills,
                tailoring_tips = EXCLUDED.tailoring_tips,
                cover_letter_points = EXCLUDED.cover_letter_points,
                experience_level_match = EXCLUDED.experience_level_match,
                domain_relevance = EXCLUDED.domain_relevance,
                recommendation = EXCLUDED.recommendation,
                provider = EXCLUDED.provider,
                model_used = EXCLUDED.model_used,
                prompt_tokens = EXCLUDED.prompt_tokens,
                completion_tokens = EXCLUDED.completion_tokens,
                created_at = EXCLUDED.created_at",
        )
        .bind(self.canonical_job_id)
        .bind(self.fit_score)
        .bind(self.verdict.to_string())
        .bind(&self.summary)
        .bind(&self.strengths)
        .bind(&self.gaps)
        .bind(&self.matched_skills)
        .bind(&self.missing_skills)
        .bind(&self.bonus_skills)
        .bind(&self.tailoring_tips)
        .bind(&self.cover_letter_points)
        .bind(&self.experience_level_match)
        .bind(&self.domain_relevance)
        .bind(&self.recommendation)
        .bind(&self.provider)
        .bind(&self.model_used)
        .bind(self.prompt_tokens)
        .bind(self.completion_tokens)
        .bind(self.created_at)
        .execute(pool)
        .await
        .context("upserting fit analysis")?;
        Ok(())
    }

    pub async fn find_by_canonical_id(
        canonical_job_id: CanonicalJobId,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, FitAnalysis>(
            "SELECT * FROM fit_analyses WHERE canonical_job_id = $1",
        )
        .bind(canonical_job_id)
        .fetch_optional(pool)
        .await
        .context("loading fit analysis")
    }
}
