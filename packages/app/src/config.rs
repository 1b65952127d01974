use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,

    /// Telegram-style bot tokens for job alerts and system/log alerts. Empty
    /// means that channel is skipped (messages only logged).
    pub jobs_bot_token: Option<String>,
    pub jobs_chat_id: Option<String>,
    pub logs_bot_token: Option<String>,
    pub logs_chat_id: Option<String>,

    /// Rotating pool of search-API keys. Empty disables discovery and the
    /// search-based connectors.
    pub search_api_keys: Vec<String>,
    pub search_base_url: String,

    /// Directory holding the 8 rule JSON files (`Rules::load_dir`).
    pub config_dir: String,

    /// Up to three primary LLM provider keys plus one fallback-provider key.
    pub llm_primary_keys: Vec<String>,
    pub llm_fallback_key: Option<String>,
    pub llm_model: Option<String>,
    pub llm_fallback_base_url: Option<String>,
    pub llm_primary_base_url: String,

    pub dry_run: bool,
    pub timezone: String,
    pub ai_analysis_min_score: i32,
    pub max_job_age_days: i64,

    /// Path to the plain-text resume blob the fit analyzer prompts with.
    pub resume_path: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,

            jobs_bot_token: env::var("JOBS_BOT_TOKEN").ok().filter(|s| !s.is_empty()),
            jobs_chat_id: env::var("JOBS_CHAT_ID").ok().filter(|s| !s.is_empty()),
            logs_bot_token: env::var("LOGS_BOT_TOKEN").ok().filter(|s| !s.is_empty()),
            logs_chat_id: env::var("LOGS_CHAT_ID").ok().filter(|s| !s.is_empty()),

            search_api_keys: split_csv_env("SEARCH_API_KEYS"),
            search_base_url: env::var("SEARCH_BASE_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/customsearch/v1".to_string()),

            config_dir: env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string()),

            llm_primary_keys: split_csv_env("LLM_API_KEYS"),
            llm_fallback_key: env::var("LLM_FALLBACK_API_KEY").ok().filter(|s| !s.is_empty()),
            llm_model: env::var("LLM_MODEL").ok().filter(|s| !s.is_empty()),
            llm_fallback_base_url: env::var("LLM_FALLBACK_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            llm_primary_base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),

            dry_run: env::var("DRY_RUN")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            timezone: env::var("TZ").unwrap_or_else(|_| "America/Toronto".to_string()),
            ai_analysis_min_score: env::var("AI_ANALYSIS_MIN_SCORE")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("AI_ANALYSIS_MIN_SCORE must be a valid number")?,
            max_job_age_days: env::var("MAX_JOB_AGE_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("MAX_JOB_AGE_DAYS must be a valid number")?,

            resume_path: env::var("RESUME_PATH").unwrap_or_else(|_| "resume.txt".to_string()),
        })
    }
}

fn split_csv_env(key: &str) -> Vec<String> {
    env::var(key)
        .ok()
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_env_handles_missing_and_blank() {
        std::env::remove_var("SPLIT_CSV_TEST_MISSING");
        assert!(split_csv_env("SPLIT_CSV_TEST_MISSING").is_empty());
    }

    #[test]
    fn split_csv_env_trims_and_drops_empties() {
        std::env::set_var("SPLIT_CSV_TEST_KEYS", " a, b ,,c");
        assert_eq!(
            split_csv_env("SPLIT_CSV_TEST_KEYS"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        std::env::remove_var("SPLIT_CSV_TEST_KEYS");
    }
}
