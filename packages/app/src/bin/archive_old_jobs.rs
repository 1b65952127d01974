//! Ad hoc archive + purge sweep, matching the Sunday-night cron tick.

use anyhow::Result;
use app::scheduler;

const ARCHIVE_AFTER_DAYS: i64 = 30;
const PURGE_AFTER_DAYS: i64 = 90;

#[tokio::main]
async fn main() -> Result<()> {
    app::bootstrap::init_tracing();
    let ctx = app::bootstrap::init().await?;

    let result = scheduler::archive_and_purge(&ctx.pool, ARCHIVE_AFTER_DAYS, PURGE_AFTER_DAYS).await?;
    println!("archived {} canonical jobs, purged {} raw jobs", result.archived, result.purged);
    Ok(())
}
