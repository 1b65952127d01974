//! Shared setup every binary needs before it can run a pipeline phase:
//! tracing, the database pool + migrations, rule files, the connector
//! registry, and the notifier/LLM collaborators. Kept here rather than
//! duplicated across `src/bin/*.rs` so the eleven CLI entry points stay
//! thin dispatchers.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use fetcher::RateLimitedFetcher;
use llm_client::KeyPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::connectors::{self, Connector};
use crate::notifier::{LoggingNotifier, Notifier, TelegramNotifier};
use crate::orchestrator::LlmProviderConfig;
use crate::rules::Rules;
use crate::search::SearchClient;

pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,sqlx=warn".into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Everything a CLI binary needs alive for the duration of one run. Owns
/// the pieces `Pipeline<'a>` only borrows, so a binary builds one `Context`
/// and constructs `Pipeline` from references into it.
pub struct Context {
    pub config: AppConfig,
    pub pool: PgPool,
    pub rules: Rules,
    pub fetcher: RateLimitedFetcher,
    pub connectors: HashMap<String, Box<dyn Connector>>,
    pub notifier: Box<dyn Notifier>,
    pub search: SearchClient,
    pub llm: LlmProviderConfig,
}

pub async fn init() -> Result<Context> {
    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running database migrations")?;

    let rules = Rules::load_dir(&config.config_dir).context("loading rule files")?;

    let fetcher = RateLimitedFetcher::new();
    let search = SearchClient::new(fetcher.clone(), config.search_api_keys.clone(), config.search_base_url.clone());
    let connectors = connectors::build_registry(&rules.sources, &search);

    let notifier: Box<dyn Notifier> = if config.jobs_bot_token.is_some() || config.logs_bot_token.is_some() {
        Box::new(TelegramNotifier::new(
            pool.clone(),
            config.jobs_bot_token.clone(),
            config.jobs_chat_id.clone(),
            config.logs_bot_token.clone(),
            config.logs_chat_id.clone(),
            config.dry_run,
        ))
    } else {
        Box::new(LoggingNotifier::new(config.dry_run))
    };

    let llm = LlmProviderConfig {
        resume_path: config.resume_path.clone(),
        primary_keys: KeyPool::new(config.llm_primary_keys.clone()),
        primary_base_url: config.llm_primary_base_url.clone(),
        model: config.llm_model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
        fallback: match (&config.llm_fallback_base_url, &config.llm_fallback_key) {
            (Some(url), Some(key)) => Some((url.clone(), key.clone())),
            _ => None,
        },
    };

    Ok(Context {
        config,
        pool,
        rules,
        fetcher,
        connectors,
        notifier,
        search,
        llm,
    })
}

impl Context {
    pub fn pipeline(&self) -> crate::orchestrator::Pipeline<'_> {
        crate::orchestrator::Pipeline {
            pool: self.pool.clone(),
            rules: &self.rules,
            fetcher: &self.fetcher,
            connectors: &self.connectors,
            notifier: self.notifier.as_ref(),
            llm: &self.llm,
            timezone: self.config.timezone.clone(),
            ai_analysis_min_score: self.config.ai_analysis_min_score,
        }
    }
}

/// `Arc`-wraps the pieces `scheduler::start` needs to outlive a single
/// request: a `'static` pipeline over leaked, process-lifetime references.
/// The leak is intentional — one `Context` per process, torn down only at
/// exit, matching the teacher's long-running scheduler process model.
pub fn leak_for_scheduler(ctx: Context) -> Arc<crate::orchestrator::Pipeline<'static>> {
    let ctx: &'static Context = Box::leak(Box::new(ctx));
    Arc::new(ctx.pipeline())
}
