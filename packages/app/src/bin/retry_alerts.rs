//! Flush whatever's due in the retry queue (§4.9's `retry-alerts` tick):
//! failed sends from a prior alert/digest that couldn't reach Telegram.

use anyhow::Result;
use app::config::AppConfig;
use app::notifier::{flush_retry_queue, TelegramNotifier};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<()> {
    app::bootstrap::init_tracing();
    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new().max_connections(5).connect(&config.database_url).await?;

    let notifier = TelegramNotifier::new(
        pool.clone(),
        config.jobs_bot_token,
        config.jobs_chat_id,
        config.logs_bot_token,
        config.logs_chat_id,
        config.dry_run,
    );

    let (sent, failed) = flush_retry_queue(&notifier, &pool).await?;
    println!("retry queue flush: {sent} sent, {failed} still failing");
    Ok(())
}
