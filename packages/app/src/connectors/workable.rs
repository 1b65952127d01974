use async_trait::async_trait;
use fetcher::{FetchOptions, RateLimitedFetcher};
use serde::Deserialize;

use crate::connectors::{synthetic_job_id, Connector, ConnectorResult};
use crate::domain::raw_job::RawJob;
use crate::rules::SourceDef;

/// `workable`: JSON listing nested under a `results` array, with a `paging`
/// object whose `next` field we follow until it is absent or repeats.
pub struct WorkableConnector;

const MAX_PAGES: usize = 10;

#[async_trait]
impl Connector for WorkableConnector {
    fn name(&self) -> &'static str {
        "workable"
    }

    async fn fetch(&self, company: &str, source_def: &SourceDef, fetcher: &RateLimitedFetcher) -> ConnectorResult {
        let template = match source_def.require_endpoint_template() {
            Ok(t) => t,
            Err(e) => return ConnectorResult::failed("workable", company, e.to_string(), 0),
        };
        let mut url = template.replace("{company}", company);

        let mut jobs = Vec::new();
        let mut total_response_time_ms = 0u64;
        let mut rate_limited = false;

        for _ in 0..MAX_PAGES {
            let outcome = fetcher.fetch(&url, &FetchOptions::default()).await;
            total_response_time_ms += outcome.response_time_ms;
            rate_limited |= outcome.rate_limited;

            if !outcome.is_success() {
                if jobs.is_empty() {
                    return ConnectorResult::failed(
                        "workable",
                        company,
                        outcome.error.unwrap_or_else(|| "non-2xx response".to_string()),
                        total_response_time_ms,
                    );
                }
                break;
            }

            let body = outcome.data.unwrap_or_default();
            let parsed: WorkableResponse = match serde_json::from_str(&body) {
                Ok(p) => p,
                Err(e) => {
                    if jobs.is_empty() {
                        return ConnectorResult::failed("workable", company, format!("parse error: {e}"), total_response_time_ms);
                    }
                    break;
                }
            };

            jobs.extend(parsed.results.into_iter().map(|p| map_posting(company, p)));

            match parsed.paging.and_then(|p| p.next) {
                Some(next) if next != url => url = next,
                _ => break,
            }
        }

        ConnectorResult::ok("workable", company, jobs, total_response_time_ms, rate_limited)
    }
}

#[derive(Debug, Deserialize)]
struct WorkableResponse {
    #[serde(default)]
    results: Vec<WorkablePosting>,
    paging: Option<WorkablePaging>,
}

#[derive(Debug, Deserialize)]
struct WorkablePaging {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkablePosting {
    shortcode: Option<String>,
    title: Option<String>,
    url: Option<String>,
    city: Option<String>,
    country: Option<String>,
    #[serde(rename = "published_on")]
    published_on: Option<String>,
    description: Option<String>,
}

fn map_posting(company: &str, posting: WorkablePosting) -> RawJob {
    let title = posting.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| "Untitled Role".to_string());
    let source_job_id = posting.shortcode.unwrap_or_else(|| synthetic_job_id("workable", company, &title));
    let url = posting.url.unwrap_or_default();
    let location_raw = match (posting.city, posting.country) {
        (Some(city), Some(country)) => format!("{city}, {country}"),
        (Some(city), None) => city,
        (None, Some(country)) => country,
        (None, None) => String::new(),
    };
    let posted_at = posting
        .published_on
        .as_deref()
        .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc());

    RawJob::new("workable", source_job_id, title, company, url)
        .with_location_raw(location_raw)
        .with_content(posting.description.unwrap_or_default())
        .with_posted_at(posted_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_city_and_country_into_location_raw() {
        let posting = WorkablePosting {
            shortcode: Some("ABC".to_string()),
            title: Some("Engineer".to_string()),
            url: Some("https://apply.workable.com/acme/j/ABC".to_string()),
            city: Some("Toronto".to_string()),
            country: Some("Canada".to_string()),
            published_on: None,
            description: None,
        };
        let job = map_posting("acme", posting);
        assert_eq!(job.location_raw, "Toronto, Canada");
    }
}
