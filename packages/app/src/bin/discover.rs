//! Board discovery (C3): run every preconfigured discovery query once and
//! upsert any ATS-shaped hits into `discovered_boards`.

use anyhow::Result;
use app::discovery;

#[tokio::main]
async fn main() -> Result<()> {
    app::bootstrap::init_tracing();
    let ctx = app::bootstrap::init().await?;

    let queries = discovery::collect_queries(&ctx.rules.sources);
    if queries.is_empty() {
        tracing::warn!("no discovery queries configured, nothing to do");
        return Ok(());
    }

    let upserted = discovery::run_discovery(&queries, &ctx.search, &ctx.pool).await?;
    tracing::info!(count = upserted.len(), "discovery run complete");
    println!("discovered/refreshed {} boards", upserted.len());
    Ok(())
}
