use async_trait::async_trait;
use fetcher::RateLimitedFetcher;
use serde::Deserialize;

use crate::connectors::{synthetic_job_id, Connector, ConnectorResult};
use crate::domain::raw_job::RawJob;
use crate::rules::SourceDef;

/// `greenhouse`: JSON array of postings plus an `id`, REST.
///
/// `GET {endpointTemplate}` with `{company}` substituted returns
/// `{"jobs": [...]}`.
pub struct GreenhouseConnector;

#[async_trait]
impl Connector for GreenhouseConnector {
    fn name(&self) -> &'static str {
        "greenhouse"
    }

    async fn fetch(&self, company: &str, source_def: &SourceDef, fetcher: &RateLimitedFetcher) -> ConnectorResult {
        let template = match source_def.require_endpoint_template() {
            Ok(t) => t,
            Err(e) => return ConnectorResult::failed("greenhouse", company, e.to_string(), 0),
        };
        let url = template.replace("{company}", company);

        let outcome = fetcher.fetch(&url, &fetcher::FetchOptions::default()).await;

        if !outcome.is_success() {
            return ConnectorResult::failed(
                "greenhouse",
                company,
                outcome.error.unwrap_or_else(|| "non-2xx response".to_string()),
                outcome.response_time_ms,
            );
        }

        let body = outcome.data.unwrap_or_default();
        let parsed: GreenhouseResponse = match serde_json::from_str(&body) {
            Ok(p) => p,
            Err(e) => return ConnectorResult::failed("greenhouse", company, format!("parse error: {e}"), outcome.response_time_ms),
        };

        let jobs = parsed
            .jobs
            .into_iter()
            .map(|posting| map_posting(company, posting))
            .collect();

        ConnectorResult::ok("greenhouse", company, jobs, outcome.response_time_ms, outcome.rate_limited)
    }
}

#[derive(Debug, Deserialize)]
struct GreenhouseResponse {
    #[serde(default)]
    jobs: Vec<GreenhousePosting>,
}

#[derive(Debug, Deserialize)]
struct GreenhousePosting {
    id: Option<i64>,
    title: Option<String>,
    absolute_url: Option<String>,
    location: Option<GreenhouseLocation>,
    updated_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseLocation {
    name: Option<String>,
}

fn map_posting(company: &str, posting: GreenhousePosting) -> RawJob {
    let title = posting.title.unwrap_or_default();
    let title = if title.trim().is_empty() {
        "Untitled Role".to_string()
    } else {
        title
    };
    let source_job_id = posting
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| synthetic_job_id("greenhouse", company, &title));
    let url = posting.absolute_url.unwrap_or_default();
    let location_raw = posting
        .location
        .and_then(|l| l.name)
        .unwrap_or_default();
    let posted_at = posting
        .updated_at
        .as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&chrono::Utc));

    let raw_payload = serde_json::json!({
        "id": source_job_id,
        "title": title,
        "url": url,
    });

    RawJob::new("greenhouse", source_job_id, title, company, url)
        .with_location_raw(location_raw)
        .with_content(posting.content.unwrap_or_default())
        .with_posted_at(posted_at)
        .with_raw_payload(raw_payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_posting_with_defaults() {
        let posting = GreenhousePosting {
            id: None,
            title: Some(String::new()),
            absolute_url: Some("https://boards.greenhouse.io/acme/jobs/1".to_string()),
            location: None,
            updated_at: None,
            content: None,
        };
        let job = map_posting("acme", posting);
        assert_eq!(job.title, "Untitled Role");
        assert!(!job.source_job_id.is_empty());
    }
}
