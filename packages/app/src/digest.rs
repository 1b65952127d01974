//! Morning/evening digest and weekly report composition. The notifier
//! transport itself is out of this engine's scope (§1); this module owns
//! the in-scope part — which jobs/metrics a digest covers — and hands the
//! rendered payload to whatever `Notifier` is wired in.

use chrono::{Duration, Utc};

use crate::domain::canonical_job::CanonicalJob;
use crate::domain::source_metric::SourceMetric;
use crate::domain::types::ScoreBand;
use crate::notifier::Notifier;

/// Which scheduled digest slot triggered this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    Morning,
    Evening,
}

impl DigestKind {
    pub fn label(&self) -> &'static str {
        match self {
            DigestKind::Morning => "morning",
            DigestKind::Evening => "evening",
        }
    }
}

/// Jobs a digest should cover: by default everything active and at least
/// `goodMatch`, found since the digest window opened; `--force-all`
/// widens that to every active job regardless of band.
const DIGEST_WINDOW_HOURS: i64 = 12;

pub async fn build_digest(pool: &sqlx::PgPool, force_all: bool) -> anyhow::Result<Vec<CanonicalJob>> {
    let since = Utc::now() - Duration::hours(DIGEST_WINDOW_HOURS);
    let jobs = CanonicalJob::list(
        500,
        0,
        None,
        Some("include"),
        Some("active"),
        Some(since),
        None,
        None,
        pool,
    )
    .await?;

    Ok(if force_all {
        jobs
    } else {
        jobs.into_iter()
            .filter(|j| matches!(j.score_band, ScoreBand::TopPriority | ScoreBand::GoodMatch))
            .collect()
    })
}

/// Run one digest: gather qualifying jobs and hand them to the notifier.
/// An empty digest still sends (or logs) a "nothing new" message so the
/// operator knows the slot fired.
pub async fn run(pool: &sqlx::PgPool, notifier: &dyn Notifier, kind: DigestKind, force_all: bool) -> anyhow::Result<usize> {
    let jobs = build_digest(pool, force_all).await?;
    notifier.send_digest(kind.label(), &jobs).await?;
    Ok(jobs.len())
}

/// Weekly report: per-source metrics over the last 7 days, handed to the
/// notifier as a summary rather than a per-job list.
pub async fn run_weekly_report(pool: &sqlx::PgPool, notifier: &dyn Notifier) -> anyhow::Result<usize> {
    let metrics = SourceMetric::weekly_summary(pool).await?;
    notifier.send_weekly_report(&metrics).await?;
    Ok(metrics.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_kind_labels_match_cli_surface() {
        assert_eq!(DigestKind::Morning.label(), "morning");
        assert_eq!(DigestKind::Evening.label(), "evening");
    }
}
