use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Daily aggregate stats per source. Unique on `(source, date)`, with an
/// additive upsert so a single day can be reported across multiple runs.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SourceMetric {
    pub source: String,
    pub metric_date: NaiveDate,
    pub jobs_found: i32,
    pub jobs_new: i32,
    pub jobs_duplicate: i32,
    pub parse_failures: i32,
    pub rate_limit_hits: i32,
    pub response_time_total_ms: i64,
    pub response_time_samples: i32,
    pub success_count: i32,
    pub attempt_count: i32,
}

impl SourceMetric {
    /// Average response time in milliseconds, or 0 if no samples.
    pub fn response_time_avg_ms(&self) -> f64 {
        if self.response_time_samples == 0 {
            0.0
        } else {
            self.response_time_total_ms as f64 / self.response_time_samples as f64
        }
    }

    /// Fraction of attempts that succeeded, or 0 if no attempts.
    pub fn success_rate(&self) -> f64 {
        if self.attempt_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.attempt_count as f64
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn additive_upsert(
        source: &str,
        metric_date: NaiveDate,
        jobs_found: i32,
        jobs_new: i32,
        jobs_duplicate: i32,
        parse_failures: i32,
        rate_limit_hits: i32,
        response_time_total_ms: i64,
        response_time_samples: i32,
        success_count: i32,
        attempt_count: i32,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO source_metrics
                (source, metric_date, jobs_found, jobs_new, jobs_duplicate, parse_failures,
                 rate_limit_hits, response_time_total_ms, response_time_samples,
                 success_count, attempt_count)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
             ON CONFLICT (source, metric_date) DO UPDATE SET
                jobs_found = source_metrics.jobs_found + EXCLUDED.jobs_found,
                jobs_new = source_metrics.jobs_new + EXCLUDED.jobs_new,
                jobs_duplicate = source_metrics.jobs_duplicate + EXCLUDED.jobs_duplicate,
                parse_failures = source_metrics.parse_failures + EXCLUDED.parse_failures,
                rate_limit_hits = source_metrics.rate_limit_hits + EXCLUDED.rate_limit_hits,
                response_time_total_ms =
                    source_metrics.response_time_total_ms + EXCLUDED.response_time_total_ms,
                response_time_samples =
                    source_metrics.response_time_samples + EXCLUDED.response_time_samples,
                success_count = source_metrics.success_count + EXCLUDED.success_count,
                attempt_count = source_metrics.attempt_count + EXCLUDED.attempt_count",
        )
        .bind(source)
        .bind(metric_date)
        .bind(jobs_found)
        .bind(jobs_new)
        .bind(jobs_duplicate)
        .bind(parse_failures)
        .bind(rate_limit_hits)
        .bind(response_time_total_ms)
        .bind(response_time_samples)
        .bind(success_count)
        .bind(attempt_count)
        .execute(pool)
        .await
        .context("upserting source metric")?;
        Ok(())
    }

    pub async fn by_source_since(days: i64, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, SourceMetric>(
            "SELECT * FROM source_metrics
             WHERE metric_date >= current_date - $1::int
             ORDER BY source, metric_date",
        )
        .bind(days as i32)
        .fetch_all(pool)
        .await
        .context("loading source metrics")
    }

    pub async fn weekly_summary(pool: &PgPool) -> Result<Vec<Self>> {
        Self::by_source_since(7, pool).await
    }
}
