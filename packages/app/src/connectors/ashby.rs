use async_trait::async_trait;
use fetcher::{FetchOptions, RateLimitedFetcher};
use serde::Deserialize;

use crate::connectors::{synthetic_job_id, Connector, ConnectorResult};
use crate::domain::raw_job::RawJob;
use crate::rules::SourceDef;

/// `ashby`: paginated JSON API reached via `POST`, single page per run (the
/// board's `jobPostings` list is already complete; no cursor-following).
pub struct AshbyConnector;

#[async_trait]
impl Connector for AshbyConnector {
    fn name(&self) -> &'static str {
        "ashby"
    }

    async fn fetch(&self, company: &str, source_def: &SourceDef, fetcher: &RateLimitedFetcher) -> ConnectorResult {
        let template = match source_def.require_endpoint_template() {
            Ok(t) => t,
            Err(e) => return ConnectorResult::failed("ashby", company, e.to_string(), 0),
        };
        let url = template.replace("{company}", company);
        let body = serde_json::json!({ "organizationHostedJobsPageName": company });

        let outcome = fetcher.post(&url, body, &FetchOptions::default()).await;
        if !outcome.is_success() {
            return ConnectorResult::failed(
                "ashby",
                company,
                outcome.error.unwrap_or_else(|| "non-2xx response".to_string()),
                outcome.response_time_ms,
            );
        }

        let raw = outcome.data.unwrap_or_default();
        let parsed: AshbyResponse = match serde_json::from_str(&raw) {
            Ok(p) => p,
            Err(e) => return ConnectorResult::failed("ashby", company, format!("parse error: {e}"), outcome.response_time_ms),
        };

        let jobs = parsed
            .jobs
            .into_iter()
            .map(|posting| map_posting(company, posting))
            .collect();

        ConnectorResult::ok("ashby", company, jobs, outcome.response_time_ms, outcome.rate_limited)
    }
}

#[derive(Debug, Deserialize)]
struct AshbyResponse {
    #[serde(rename = "jobPostings", default)]
    jobs: Vec<AshbyPosting>,
}

#[derive(Debug, Deserialize)]
struct AshbyPosting {
    id: Option<String>,
    title: Option<String>,
    #[serde(rename = "jobUrl")]
    job_url: Option<String>,
    location: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(rename = "descriptionHtml")]
    description_html: Option<String>,
}

fn map_posting(company: &str, posting: AshbyPosting) -> RawJob {
    let title = posting.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| "Untitled Role".to_string());
    let source_job_id = posting.id.unwrap_or_else(|| synthetic_job_id("ashby", company, &title));
    let url = posting.job_url.unwrap_or_default();
    let posted_at = posting
        .published_at
        .as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&chrono::Utc));

    RawJob::new("ashby", source_job_id, title, company, url)
        .with_location_raw(posting.location.unwrap_or_default())
        .with_content(posting.description_html.unwrap_or_default())
        .with_posted_at(posted_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_posting_with_missing_title() {
        let posting = AshbyPosting {
            id: Some("abc".to_string()),
            title: None,
            job_url: Some("https://jobs.ashbyhq.com/acme/abc".to_string()),
            location: Some("Remote".to_string()),
            published_at: None,
            description_html: None,
        };
        let job = map_posting("acme", posting);
        assert_eq!(job.title, "Untitled Role");
        assert_eq!(job.source_job_id, "abc");
    }
}
