use async_trait::async_trait;
use fetcher::{html, FetchOptions, RateLimitedFetcher};
use url::Url;

use crate::connectors::{broad_job_anchors, dedupe_by_href, synthetic_job_id, Connector, ConnectorResult};
use crate::domain::raw_job::RawJob;
use crate::rules::SourceDef;

/// `icims`: iCIMS-hosted career sites render a job list as plain anchors
/// under `/jobs/` with the location embedded in the link text after a
/// trailing dash, e.g. `"Staff Accountant - Toronto, ON"`.
pub struct IcimsConnector;

const JOB_PATH_MARKERS: &[&str] = &["/jobs/", "/job/"];

#[async_trait]
impl Connector for IcimsConnector {
    fn name(&self) -> &'static str {
        "icims"
    }

    async fn fetch(&self, company: &str, source_def: &SourceDef, fetcher: &RateLimitedFetcher) -> ConnectorResult {
        let template = match source_def.require_url_template() {
            Ok(t) => t,
            Err(e) => return ConnectorResult::failed("icims", company, e.to_string(), 0),
        };
        let url = template.replace("{company}", company);

        let outcome = fetcher.fetch(&url, &FetchOptions::default()).await;
        if !outcome.is_success() {
            return ConnectorResult::failed(
                "icims",
                company,
                outcome.error.unwrap_or_else(|| "non-2xx response".to_string()),
                outcome.response_time_ms,
            );
        }

        let body = outcome.data.unwrap_or_default();
        let base = match Url::parse(&url) {
            Ok(u) => u,
            Err(e) => return ConnectorResult::failed("icims", company, format!("invalid base url: {e}"), outcome.response_time_ms),
        };

        let all_anchors = html::extract_anchors(&body, &base);
        let mut matched: Vec<(String, String)> = all_anchors
            .iter()
            .filter(|(_, href)| href.to_lowercase().contains("/jobs/"))
            .cloned()
            .collect();
        if matched.is_empty() {
            matched = broad_job_anchors(&all_anchors, JOB_PATH_MARKERS);
        }
        let matched = dedupe_by_href(matched);

        if matched.is_empty() {
            return ConnectorResult::failed("icims", company, "page returned 200 but no job anchors were found", outcome.response_time_ms);
        }

        let jobs = matched.into_iter().map(|(text, href)| map_anchor(company, text, href)).collect();

        ConnectorResult::ok("icims", company, jobs, outcome.response_time_ms, outcome.rate_limited)
    }
}

fn map_anchor(company: &str, text: String, href: String) -> RawJob {
    let (title, location_raw) = split_title_and_location(&text);
    let source_job_id = synthetic_job_id("icims", company, &href);
    RawJob::new("icims", source_job_id, title, company, href).with_location_raw(location_raw)
}

/// iCIMS link text is conventionally `"Title - City, Province"`; split on
/// the last `" - "` to separate the two.
fn split_title_and_location(text: &str) -> (String, String) {
    match text.rsplit_once(" - ") {
        Some((title, location)) => (title.trim().to_string(), location.trim().to_string()),
        None => (text.trim().to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_title_and_trailing_location() {
        let (title, location) = split_title_and_location("Staff Accountant - Toronto, ON");
        assert_eq!(title, "Staff Accountant");
        assert_eq!(location, "Toronto, ON");
    }

    #[test]
    fn falls_back_to_full_text_when_no_separator() {
        let (title, location) = split_title_and_location("Staff Accountant");
        assert_eq!(title, "Staff Accountant");
        assert_eq!(location, "");
    }

    #[test]
    fn broad_fallback_excludes_cta_anchors_when_primary_pass_is_empty() {
        let base = Url::parse("https://careers.acme.com/").unwrap();
        let html = r#"
            <a href="/jobs">Apply Now</a>
            <a href="/job/42">Staff Accountant - Toronto, ON</a>
        "#;
        let all = html::extract_anchors(html, &base);
        let primary: Vec<_> = all.iter().filter(|(_, href)| href.to_lowercase().contains("/jobs/")).collect();
        assert!(primary.is_empty());
        let fallback = broad_job_anchors(&all, JOB_PATH_MARKERS);
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].1, "https://careers.acme.com/job/42");
    }

    #[test]
    fn dedupe_by_href_collapses_repeated_anchors() {
        let anchors = vec![
            ("Staff Accountant".to_string(), "https://careers.acme.com/jobs/1".to_string()),
            ("Staff Accountant (again)".to_string(), "https://careers.acme.com/jobs/1".to_string()),
        ];
        let deduped = dedupe_by_href(anchors);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].0, "Staff Accountant");
    }
}
