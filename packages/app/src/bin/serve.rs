//! Long-running process: the read/write HTTP API plus the cron scheduler
//! driving ingestion, digests, and maintenance in the background.

use anyhow::{Context, Result};
use app::server::{build_router, AppState};
use chrono_tz::Tz;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    app::bootstrap::init_tracing();
    let ctx = app::bootstrap::init().await?;

    let timezone: Tz = ctx.config.timezone.parse().unwrap_or(chrono_tz::America::Toronto);
    let max_job_age_days = ctx.config.max_job_age_days;
    let port = ctx.config.port;
    let pool = ctx.pool.clone();
    let config = Arc::new(ctx.config.clone());

    let pipeline = app::bootstrap::leak_for_scheduler(ctx);

    if let Err(e) = app::scheduler::run_catch_up_if_stale(&pipeline).await {
        tracing::error!(error = %e, "startup catch-up run failed");
    }

    let (_scheduler, _lock) = app::scheduler::start(pipeline, timezone, max_job_age_days)
        .await
        .context("starting cron scheduler")?;

    let state = AppState { pool, config };
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr, "starting HTTP API");
    let listener = tokio::net::TcpListener::bind(&addr).await.context("binding HTTP listener")?;
    axum::serve(listener, app).await.context("HTTP server error")?;

    Ok(())
}
