//! Shared web-search API client used by the search-based aggregator/
//! underground connectors (C2) and board discovery (C3). Both rotate
//! through the same configured key pool; when it's empty, both are
//! disabled at the orchestrator level rather than failing loudly.

use std::time::Duration;

use anyhow::{Context, Result};
use fetcher::{FetchOptions, RateLimitedFetcher};
use llm_client::KeyPool;
use serde::Deserialize;

const KEY_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub link: String,
    pub title: String,
    pub snippet: String,
}

#[derive(Clone)]
pub struct SearchClient {
    fetcher: RateLimitedFetcher,
    keys: KeyPool,
    base_url: String,
}

impl SearchClient {
    pub fn new(fetcher: RateLimitedFetcher, api_keys: Vec<String>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            keys: KeyPool::new(api_keys),
            base_url: base_url.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.keys.size() > 0
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let guard = self
            .keys
            .acquire(KEY_ACQUIRE_TIMEOUT)
            .await
            .context("no search API key available")?;

        let encode = |s: &str| url::form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>();
        let url = format!("{}?q={}&key={}", self.base_url, encode(query), encode(guard.key()));
        let outcome = self.fetcher.fetch(&url, &FetchOptions::default()).await;
        guard.release().await;

        if !outcome.is_success() {
            anyhow::bail!(outcome.error.unwrap_or_else(|| "search request failed".to_string()));
        }

        let body = outcome.data.unwrap_or_default();
        let parsed: SearchEnvelope = serde_json::from_str(&body).context("parsing search API response")?;
        Ok(parsed
            .items
            .into_iter()
            .map(|item| SearchResult {
                link: item.link.unwrap_or_default(),
                title: item.title.unwrap_or_default(),
                snippet: item.snippet.unwrap_or_default(),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: Option<String>,
    title: Option<String>,
    snippet: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_when_key_pool_is_empty() {
        let client = SearchClient::new(RateLimitedFetcher::new(), vec![], "https://example.com/search");
        assert!(!client.is_enabled());
    }
}
