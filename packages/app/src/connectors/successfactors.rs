use async_trait::async_trait;
use fetcher::{batch_fetch, html, BatchOptions, FetchOptions, RateLimitedFetcher};
use serde::Deserialize;

use crate::connectors::{synthetic_job_id, Connector, ConnectorResult};
use crate::domain::raw_job::RawJob;
use crate::rules::SourceDef;

/// `successfactors`: SAP's OData-flavored listing wraps postings under
/// `d.results`; descriptions again live on a separate HTML detail page.
pub struct SuccessFactorsConnector;

#[async_trait]
impl Connector for SuccessFactorsConnector {
    fn name(&self) -> &'static str {
        "successfactors"
    }

    async fn fetch(&self, company: &str, source_def: &SourceDef, fetcher: &RateLimitedFetcher) -> ConnectorResult {
        let template = match source_def.require_endpoint_template() {
            Ok(t) => t,
            Err(e) => return ConnectorResult::failed("successfactors", company, e.to_string(), 0),
        };
        let url = template.replace("{company}", company);

        let outcome = fetcher.fetch(&url, &FetchOptions::default()).await;
        if !outcome.is_success() {
            return ConnectorResult::failed(
                "successfactors",
                company,
                outcome.error.unwrap_or_else(|| "non-2xx response".to_string()),
                outcome.response_time_ms,
            );
        }

        let body = outcome.data.unwrap_or_default();
        let parsed: SuccessFactorsEnvelope = match serde_json::from_str(&body) {
            Ok(p) => p,
            Err(e) => {
                return ConnectorResult::failed(
                    "successfactors",
                    company,
                    format!("parse error: {e}"),
                    outcome.response_time_ms,
                )
            }
        };

        let postings = parsed.d.results;
        let batch_opts = BatchOptions {
            batch_size: source_def.rate_limiting.batch_size.unwrap_or(5),
            delay_between_requests_ms: source_def.rate_limiting.delay_between_requests_ms.unwrap_or(0),
            batch_pause_ms: source_def.rate_limiting.batch_pause_ms.unwrap_or(0),
        };

        let details = batch_fetch(
            postings.iter().map(|p| p.job_post_url.clone()).collect(),
            |detail_url: Option<String>| {
                let fetcher = fetcher.clone();
                async move {
                    match detail_url {
                        Some(u) => Some(fetcher.fetch(&u, &FetchOptions::default()).await),
                        None => None,
                    }
                }
            },
            &batch_opts,
        )
        .await;

        let jobs = postings
            .into_iter()
            .zip(details)
            .map(|(posting, detail)| {
                let content = detail
                    .filter(|d| d.is_success())
                    .and_then(|d| d.data)
                    .map(|body| html::html_to_markdown(&body))
                    .unwrap_or_default();
                map_posting(company, posting, content)
            })
            .collect();

        ConnectorResult::ok("successfactors", company, jobs, outcome.response_time_ms, outcome.rate_limited)
    }
}

#[derive(Debug, Deserialize)]
struct SuccessFactorsEnvelope {
    d: SuccessFactorsResults,
}

#[derive(Debug, Deserialize)]
struct SuccessFactorsResults {
    #[serde(default)]
    results: Vec<SuccessFactorsPosting>,
}

#[derive(Debug, Deserialize)]
struct SuccessFactorsPosting {
    #[serde(rename = "jobAdId")]
    job_ad_id: Option<String>,
    #[serde(rename = "jobTitle")]
    job_title: Option<String>,
    #[serde(rename = "jobPostUrl")]
    job_post_url: Option<String>,
    #[serde(rename = "location")]
    location: Option<String>,
    #[serde(rename = "postedDate")]
    posted_date: Option<String>,
}

fn map_posting(company: &str, posting: SuccessFactorsPosting, content: String) -> RawJob {
    let title = posting.job_title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| "Untitled Role".to_string());
    let source_job_id = posting.job_ad_id.unwrap_or_else(|| synthetic_job_id("successfactors", company, &title));
    let url = posting.job_post_url.unwrap_or_default();
    let posted_at = posting
        .posted_date
        .as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&chrono::Utc));

    RawJob::new("successfactors", source_job_id, title, company, url)
        .with_location_raw(posting.location.unwrap_or_default())
        .with_content(content)
        .with_posted_at(posted_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_id_when_job_ad_id_missing() {
        let posting = SuccessFactorsPosting {
            job_ad_id: None,
            job_title: Some("Analyst".to_string()),
            job_post_url: Some("https://careers.acme.com/job/1".to_string()),
            location: Some("Remote".to_string()),
            posted_date: None,
        };
        let job = map_posting("acme", posting, String::new());
        assert_eq!(job.source_job_id.len(), 64);
    }
}
