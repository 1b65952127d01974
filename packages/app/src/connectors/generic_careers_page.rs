use async_trait::async_trait;
use fetcher::{html, FetchOptions, RateLimitedFetcher};
use url::Url;

use crate::connectors::{broad_job_anchors, dedupe_by_href, synthetic_job_id, Connector, ConnectorResult};
use crate::domain::raw_job::RawJob;
use crate::rules::SourceDef;

/// `genericCareersPage`: no platform API at all, just a careers page whose
/// anchors are heuristically filtered down to ones that look like job
/// postings. Lower-precision than the JSON connectors by nature.
pub struct GenericCareersPageConnector;

const JOB_PATH_MARKERS: &[&str] = &["/job", "/jobs", "/careers/", "/position", "/opening", "/vacanc"];

#[async_trait]
impl Connector for GenericCareersPageConnector {
    fn name(&self) -> &'static str {
        "genericCareersPage"
    }

    async fn fetch(&self, company: &str, source_def: &SourceDef, fetcher: &RateLimitedFetcher) -> ConnectorResult {
        let template = match source_def.require_url_template() {
            Ok(t) => t,
            Err(e) => return ConnectorResult::failed("genericCareersPage", company, e.to_string(), 0),
        };
        let url = template.replace("{company}", company);

        let outcome = fetcher.fetch(&url, &FetchOptions::default()).await;
        if !outcome.is_success() {
            return ConnectorResult::failed(
                "genericCareersPage",
                company,
                outcome.error.unwrap_or_else(|| "non-2xx response".to_string()),
                outcome.response_time_ms,
            );
        }

        let body = outcome.data.unwrap_or_default();
        let base = match Url::parse(&url) {
            Ok(u) => u,
            Err(e) => return ConnectorResult::failed("genericCareersPage", company, format!("invalid base url: {e}"), outcome.response_time_ms),
        };

        let all_anchors = html::extract_anchors(&body, &base);
        let mut matched = extract_job_anchors(&all_anchors);
        if matched.is_empty() {
            matched = broad_job_anchors(&all_anchors, JOB_PATH_MARKERS);
        }
        let matched = dedupe_by_href(matched);

        if matched.is_empty() {
            return ConnectorResult::failed(
                "genericCareersPage",
                company,
                "page returned 200 but no job anchors were found",
                outcome.response_time_ms,
            );
        }

        let jobs = matched.into_iter().map(|(title, href)| map_anchor(company, title, href)).collect();

        ConnectorResult::ok("genericCareersPage", company, jobs, outcome.response_time_ms, outcome.rate_limited)
    }
}

/// Primary selector: anchors whose href path looks like a job-detail link
/// and whose text is a plausible title (neither empty nor boilerplate-short).
fn extract_job_anchors(anchors: &[(String, String)]) -> Vec<(String, String)> {
    anchors
        .iter()
        .filter(|(text, href)| {
            let lower_href = href.to_lowercase();
            let looks_like_job_path = JOB_PATH_MARKERS.iter().any(|marker| lower_href.contains(marker));
            let looks_like_title = text.split_whitespace().count() >= 2 && text.len() <= 200;
            looks_like_job_path && looks_like_title
        })
        .cloned()
        .collect()
}

fn map_anchor(company: &str, title: String, href: String) -> RawJob {
    let source_job_id = synthetic_job_id("genericCareersPage", company, &href);
    RawJob::new("genericCareersPage", source_job_id, title, company, href)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_out_non_job_anchors() {
        let base = Url::parse("https://careers.acme.com/").unwrap();
        let html = r#"
            <a href="/about">About Us</a>
            <a href="/jobs/senior-engineer">Senior Software Engineer</a>
            <a href="/careers/123">X</a>
        "#;
        let all = html::extract_anchors(html, &base);
        let anchors = extract_job_anchors(&all);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].0, "Senior Software Engineer");
    }

    #[test]
    fn broad_fallback_excludes_cta_anchors_when_primary_pass_is_empty() {
        let base = Url::parse("https://careers.acme.com/").unwrap();
        let html = r#"
            <a href="/jobs">Apply Now</a>
            <a href="/jobs/42">X</a>
        "#;
        let all = html::extract_anchors(html, &base);
        assert!(extract_job_anchors(&all).is_empty());
        let fallback = broad_job_anchors(&all, JOB_PATH_MARKERS);
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].1, "https://careers.acme.com/jobs/42");
    }
}
