use async_trait::async_trait;
use fetcher::{FetchOptions, RateLimitedFetcher};
use serde::Deserialize;

use crate::connectors::{synthetic_job_id, Connector, ConnectorResult};
use crate::domain::raw_job::RawJob;
use crate::rules::SourceDef;

/// `lever`: flat JSON array of postings, REST, no wrapper object.
pub struct LeverConnector;

#[async_trait]
impl Connector for LeverConnector {
    fn name(&self) -> &'static str {
        "lever"
    }

    async fn fetch(&self, company: &str, source_def: &SourceDef, fetcher: &RateLimitedFetcher) -> ConnectorResult {
        let template = match source_def.require_endpoint_template() {
            Ok(t) => t,
            Err(e) => return ConnectorResult::failed("lever", company, e.to_string(), 0),
        };
        let url = template.replace("{company}", company);

        let outcome = fetcher.fetch(&url, &FetchOptions::default()).await;
        if !outcome.is_success() {
            return ConnectorResult::failed(
                "lever",
                company,
                outcome.error.unwrap_or_else(|| "non-2xx response".to_string()),
                outcome.response_time_ms,
            );
        }

        let body = outcome.data.unwrap_or_default();
        let postings: Vec<LeverPosting> = match serde_json::from_str(&body) {
            Ok(p) => p,
            Err(e) => return ConnectorResult::failed("lever", company, format!("parse error: {e}"), outcome.response_time_ms),
        };

        let jobs = postings.into_iter().map(|p| map_posting(company, p)).collect();
        ConnectorResult::ok("lever", company, jobs, outcome.response_time_ms, outcome.rate_limited)
    }
}

#[derive(Debug, Deserialize)]
struct LeverPosting {
    id: Option<String>,
    text: Option<String>,
    #[serde(rename = "hostedUrl")]
    hosted_url: Option<String>,
    categories: Option<LeverCategories>,
    #[serde(rename = "createdAt")]
    created_at: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeverCategories {
    location: Option<String>,
}

fn map_posting(company: &str, posting: LeverPosting) -> RawJob {
    let title = posting.text.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| "Untitled Role".to_string());
    let source_job_id = posting.id.unwrap_or_else(|| synthetic_job_id("lever", company, &title));
    let url = posting.hosted_url.unwrap_or_default();
    let location_raw = posting.categories.and_then(|c| c.location).unwrap_or_default();
    let posted_at = posting
        .created_at
        .and_then(|ms| chrono::DateTime::from_timestamp_millis(ms));

    RawJob::new("lever", source_job_id, title, company, url)
        .with_location_raw(location_raw)
        .with_content(posting.description.unwrap_or_default())
        .with_posted_at(posted_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_posting_with_missing_id_to_synthetic() {
        let posting = LeverPosting {
            id: None,
            text: Some("Engineer".to_string()),
            hosted_url: Some("https://jobs.lever.co/acme/1".to_string()),
            categories: None,
            created_at: None,
            description: None,
        };
        let job = map_posting("acme", posting);
        assert_eq!(job.source_job_id.len(), 64);
    }
}
