//! Expired-link sweep: every active job gets one GET against its posting
//! URL; a failing fetch marks it `expired` so it drops out of future
//! digests and listings.

use std::time::Duration;

use anyhow::Result;
use app::domain::canonical_job::CanonicalJob;
use app::domain::types::JobStatus;
use fetcher::FetchOptions;

#[tokio::main]
async fn main() -> Result<()> {
    app::bootstrap::init_tracing();
    let ctx = app::bootstrap::init().await?;

    let jobs = CanonicalJob::find_all_active(&ctx.pool).await?;
    let check_opts = FetchOptions {
        timeout: Duration::from_secs(10),
        max_retries: 1,
        backoff_start_ms: 250,
    };

    let mut expired = 0u32;
    for job in &jobs {
        let outcome = ctx.fetcher.fetch(&job.url, &check_opts).await;
        if !outcome.is_success() {
            CanonicalJob::update_status(job.id, JobStatus::Expired, &ctx.pool).await?;
            expired += 1;
        }
    }

    tracing::info!(checked = jobs.len(), expired, "expired-link sweep complete");
    println!("checked {} jobs, marked {expired} expired", jobs.len());
    Ok(())
}
