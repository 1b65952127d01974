//! Human-readable snapshot of recent pipeline runs, for checking in on a
//! deployment without going through the HTTP API.

use anyhow::Result;
use app::domain::run_log::RunLog;

const RECENT_RUNS: i64 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    app::bootstrap::init_tracing();
    let ctx = app::bootstrap::init().await?;

    let runs = RunLog::recent(RECENT_RUNS, &ctx.pool).await?;
    if runs.is_empty() {
        println!("no runs recorded yet");
        return Ok(());
    }

    for run in runs {
        println!(
            "{}  {:<24}  {:<20}  found={:<5} new={:<5} dup={:<5} rejected={:<5} alerts={}",
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.run_type,
            run.status,
            run.jobs_found,
            run.jobs_new,
            run.jobs_duplicate,
            run.jobs_rejected,
            run.alerts_sent,
        );
    }

    Ok(())
}
