use async_trait::async_trait;
use fetcher::{batch_fetch, html, BatchOptions, FetchOptions, RateLimitedFetcher};
use serde::Deserialize;

use crate::connectors::{synthetic_job_id, Connector, ConnectorResult};
use crate::domain::raw_job::RawJob;
use crate::rules::SourceDef;

/// `smartrecruiters`: the listing endpoint returns JSON with bare metadata
/// only (no description); the full posting text lives on an HTML detail
/// page fetched per job.
pub struct SmartRecruitersConnector;

#[async_trait]
impl Connector for SmartRecruitersConnector {
    fn name(&self) -> &'static str {
        "smartrecruiters"
    }

    async fn fetch(&self, company: &str, source_def: &SourceDef, fetcher: &RateLimitedFetcher) -> ConnectorResult {
        let template = match source_def.require_endpoint_template() {
            Ok(t) => t,
            Err(e) => return ConnectorResult::failed("smartrecruiters", company, e.to_string(), 0),
        };
        let url = template.replace("{company}", company);

        let outcome = fetcher.fetch(&url, &FetchOptions::default()).await;
        if !outcome.is_success() {
            return ConnectorResult::failed(
                "smartrecruiters",
                company,
                outcome.error.unwrap_or_else(|| "non-2xx response".to_string()),
                outcome.response_time_ms,
            );
        }

        let body = outcome.data.unwrap_or_default();
        let parsed: SmartRecruitersResponse = match serde_json::from_str(&body) {
            Ok(p) => p,
            Err(e) => {
                return ConnectorResult::failed(
                    "smartrecruiters",
                    company,
                    format!("parse error: {e}"),
                    outcome.response_time_ms,
                )
            }
        };

        let postings = parsed.content;
        let batch_opts = BatchOptions {
            batch_size: source_def.rate_limiting.batch_size.unwrap_or(5),
            delay_between_requests_ms: source_def.rate_limiting.delay_between_requests_ms.unwrap_or(0),
            batch_pause_ms: source_def.rate_limiting.batch_pause_ms.unwrap_or(0),
        };

        let details = batch_fetch(
            postings.iter().map(|p| p.job_ad_url()).collect(),
            |detail_url| {
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

        ConnectorResult::ok("smartrecruiters", company, jobs, outcome.response_time_ms, outcome.rate_limited)
    }
}

#[derive(Debug, Deserialize)]
struct SmartRecruitersResponse {
    #[serde(default)]
    content: Vec<SmartRecruitersPosting>,
}

#[derive(Debug, Deserialize)]
struct SmartRecruitersPosting {
    id: Option<String>,
    name: Option<String>,
    #[serde(rename = "releasedDate")]
    released_date: Option<String>,
    location: Option<SmartRecruitersLocation>,
    #[serde(rename = "jobAdUrl")]
    job_ad_url: Option<SmartRecruitersUrl>,
}

impl SmartRecruitersPosting {
    fn job_ad_url(&self) -> Option<String> {
        self.job_ad_url.as_ref().map(|u| u.url.clone())
    }
}

#[derive(Debug, Deserialize)]
struct SmartRecruitersUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SmartRecruitersLocation {
    city: Option<String>,
    region: Option<String>,
    remote: Option<bool>,
}

fn map_posting(company: &str, posting: SmartRecruitersPosting, content: String) -> RawJob {
    let title = posting.name.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| "Untitled Role".to_string());
    let source_job_id = posting.id.clone().unwrap_or_else(|| synthetic_job_id("smartrecruiters", company, &title));
    let url = posting.job_ad_url.as_ref().map(|u| u.url.clone()).unwrap_or_default();
    let location_raw = match posting.location {
        Some(loc) if loc.remote.unwrap_or(false) => "Remote".to_string(),
        Some(loc) => match (loc.city, loc.region) {
            (Some(city), Some(region)) => format!("{city}, {region}"),
            (Some(city), None) => city,
            (None, Some(region)) => region,
            (None, None) => String::new(),
        },
        None => String::new(),
    };
    let posted_at = posting
        .released_date
        .as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&chrono::Utc));

    RawJob::new("smartrecruiters", source_job_id, title, company, url)
        .with_location_raw(location_raw)
        .with_content(content)
        .with_posted_at(posted_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_flag_overrides_city_region() {
        let posting = SmartRecruitersPosting {
            id: Some("1".to_string()),
            name: Some("Engineer".to_string()),
            released_date: None,
            location: Some(SmartRecruitersLocation {
                city: Some("Toronto".to_string()),
                region: Some("ON".to_string()),
                remote: Some(true),
            }),
            job_ad_url: None,
        };
        let job = map_posting("acme", posting, String::new());
        assert_eq!(job.location_raw, "Remote");
    }
}
