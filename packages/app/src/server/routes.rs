use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::alternate_url::AlternateUrl;
use crate::domain::canonical_job::{CanonicalJob, CanonicalJobId};
use crate::domain::fit_analysis::FitAnalysis;
use crate::domain::source_metric::SourceMetric;
use crate::domain::types::JobStatus;
use crate::server::error::AppResult;
use crate::server::state::AppState;

pub async fn health(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let database_ok = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&state.pool).await.is_ok();
    Ok(Json(json!({
        "status": if database_ok { "ok" } else { "degraded" },
        "database": { "ok": database_ok },
    })))
}

pub async fn status(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let recent_run = crate::domain::run_log::RunLog::most_recent_completed(&state.pool).await?;
    Ok(Json(json!({
        "dryRun": state.config.dry_run,
        "timezone": state.config.timezone,
        "aiAnalysisMinScore": state.config.ai_analysis_min_score,
        "maxJobAgeDays": state.config.max_job_age_days,
        "lastCompletedRun": recent_run,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub band: Option<String>,
    pub bucket: Option<String>,
    pub status: Option<String>,
    pub since: Option<DateTime<Utc>>,
    #[serde(rename = "minScore")]
    pub min_score: Option<i32>,
    pub tiers: Option<String>,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_jobs(State(state): State<AppState>, Query(q): Query<ListJobsQuery>) -> AppResult<Json<Vec<CanonicalJob>>> {
    let tiers: Option<Vec<String>> = q.tiers.map(|s| s.split(',').map(|t| t.trim().to_string()).collect());
    let jobs = CanonicalJob::list(
        q.limit,
        q.offset,
        q.band.as_deref(),
        q.bucket.as_deref(),
        q.status.as_deref(),
        q.since,
        q.min_score,
        tiers.as_deref(),
        &state.pool,
    )
    .await?;
    Ok(Json(jobs))
}

pub async fn get_job(State(state): State<AppState>, Path(id): Path<CanonicalJobId>) -> AppResult<Json<Value>> {
    let job = CanonicalJob::find_by_id(id, &state.pool).await?;
    let fit_analysis = FitAnalysis::find_by_canonical_id(id, &state.pool).await?;
    let alternate_urls = AlternateUrl::list_for_job(id, &state.pool).await?;
    Ok(Json(json!({
        "job": job,
        "fitAnalysis": fit_analysis,
        "alternateUrls": alternate_urls,
    })))
}

pub async fn mark_applied(State(state): State<AppState>, Path(id): Path<CanonicalJobId>) -> AppResult<Json<Value>> {
    CanonicalJob::update_status(id, JobStatus::Applied, &state.pool).await?;
    Ok(Json(json!({ "id": id, "status": "applied" })))
}

pub async fn mark_dismissed(State(state): State<AppState>, Path(id): Path<CanonicalJobId>) -> AppResult<Json<Value>> {
    CanonicalJob::update_status(id, JobStatus::Dismissed, &state.pool).await?;
    Ok(Json(json!({ "id": id, "status": "dismissed" })))
}

#[derive(Debug, Deserialize)]
pub struct TelegramCallback {
    pub action: String,
}

/// `action` is `applied_<id>` or `skip_<id>` per the callback-query
/// contract; anything else is a no-op acknowledged with 200 so the bot
/// client doesn't retry.
pub async fn telegram_callback(State(state): State<AppState>, Json(payload): Json<TelegramCallback>) -> AppResult<Json<Value>> {
    let (prefix, rest) = match payload.action.split_once('_') {
        Some(parts) => parts,
        None => return Ok(Json(json!({ "handled": false }))),
    };

    let Ok(id) = rest.parse::<CanonicalJobId>() else {
        return Ok(Json(json!({ "handled": false })));
    };

    let new_status = match prefix {
        "applied" => JobStatus::Applied,
        "skip" => JobStatus::Dismissed,
        _ => return Ok(Json(json!({ "handled": false }))),
    };

    CanonicalJob::update_status(id, new_status, &state.pool).await?;
    Ok(Json(json!({ "handled": true, "id": id, "status": new_status.to_string() })))
}

#[derive(Debug, Deserialize)]
pub struct SourceAnalyticsQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    7
}

pub async fn source_analytics(State(state): State<AppState>, Query(q): Query<SourceAnalyticsQuery>) -> AppResult<Json<Vec<SourceMetric>>> {
    Ok(Json(SourceMetric::by_source_since(q.days, &state.pool).await?))
}

pub async fn weekly_analytics(State(state): State<AppState>) -> AppResult<Json<Vec<SourceMetric>>> {
    Ok(Json(SourceMetric::weekly_summary(&state.pool).await?))
}
