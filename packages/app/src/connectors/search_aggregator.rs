use async_trait::async_trait;
use fetcher::RateLimitedFetcher;
use regex::Regex;

use crate::connectors::{synthetic_job_id, Connector, ConnectorResult};
use crate::domain::raw_job::RawJob;
use crate::rules::SourceDef;
use crate::search::SearchClient;

const BLOCKED_TITLE_KEYWORDS: &[&str] = &["sales", "marketing", "recruiter", "account executive", "business development"];

/// Search-based `aggregator`/`underground` connectors: issue each
/// preconfigured query against the shared search API and turn the results
/// into RawJobs. `search_def.queries` drives what gets searched; the
/// `url_allow`/`url_deny` shape filters tell real postings apart from
/// index pages.
pub struct SearchAggregatorConnector {
    pub source_name: String,
    pub search: SearchClient,
    pub url_allow: Vec<String>,
    pub url_deny: Vec<String>,
}

#[async_trait]
impl Connector for SearchAggregatorConnector {
    fn name(&self) -> &str {
        &self.source_name
    }

    async fn fetch(&self, company: &str, source_def: &SourceDef, _fetcher: &RateLimitedFetcher) -> ConnectorResult {
        if !self.search.is_enabled() {
            return ConnectorResult::failed(&self.source_name, company, "search API key pool is empty", 0);
        }

        let mut jobs = Vec::new();
        let mut total_ms = 0u64;

        for query in &source_def.queries {
            let start = std::time::Instant::now();
            let results = match self.search.search(query).await {
                Ok(r) => r,
                Err(e) => {
                    return ConnectorResult::failed(&self.source_name, company, e.to_string(), total_ms);
                }
            };
            total_ms += start.elapsed().as_millis() as u64;

            for result in results {
                if !url_matches(&result.link, &self.url_allow, &self.url_deny) {
                    continue;
                }
                if is_blocked_title(&result.title) {
                    continue;
                }
                jobs.push(map_result(&self.source_name, &result.link, &result.title, &result.snippet));
            }
        }

        ConnectorResult::ok(&self.source_name, company, jobs, total_ms, false)
    }
}

fn url_matches(url: &str, allow: &[String], deny: &[String]) -> bool {
    let lower = url.to_lowercase();
    if deny.iter().any(|d| lower.contains(d)) {
        return false;
    }
    allow.is_empty() || allow.iter().any(|a| lower.contains(a))
}

fn is_blocked_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    BLOCKED_TITLE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// `"Title at Company"` or `"Company - Title"` (also `–`/`—`/`|`).
fn extract_company_and_title(title: &str) -> (String, String) {
    if let Some(idx) = title.to_lowercase().rfind(" at ") {
        let (job_title, rest) = title.split_at(idx);
        let company = rest[" at ".len()..].trim();
        if !company.is_empty() {
            return (company.to_string(), job_title.trim().to_string());
        }
    }

    let sep_re = Regex::new(r"\s[-–—|]\s").unwrap();
    if let Some(m) = sep_re.find(title) {
        let company = title[..m.start()].trim();
        let job_title = title[m.end()..].trim();
        if !company.is_empty() && !job_title.is_empty() {
            return (company.to_string(), job_title.to_string());
        }
    }

    ("Unknown Company".to_string(), title.trim().to_string())
}

/// Recognizes `today`, `yesterday`, `N hours/days/weeks ago`; anything else
/// is left for the normalizer to mark low-confidence.
fn parse_relative_snippet_date(snippet: &str) -> Option<String> {
    let lower = snippet.to_lowercase();
    if lower.contains("today") {
        return Some("today".to_string());
    }
    if lower.contains("yesterday") {
        return Some("yesterday".to_string());
    }
    let re = Regex::new(r"(\d+)\s+(hour|day|week)s?\s+ago").unwrap();
    re.captures(&lower).map(|c| format!("{} {} ago", &c[1], &c[2]))
}

fn map_result(source: &str, link: &str, title: &str, snippet: &str) -> RawJob {
    let (company, job_title) = extract_company_and_title(title);
    let source_job_id = synthetic_job_id(source, &company, link);
    let posted_phrase = parse_relative_snippet_date(snippet);

    let mut job = RawJob::new(source, source_job_id, job_title, company, link.to_string()).with_content(snippet.to_string());
    if let Some(phrase) = posted_phrase {
        job.posted_at_raw = Some(phrase);
    }
    job
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_company_from_at_pattern() {
        let (company, title) = extract_company_and_title("Senior Backend Engineer at Acme Corp");
        assert_eq!(company, "Acme Corp");
        assert_eq!(title, "Senior Backend Engineer");
    }

    #[test]
    fn extracts_company_from_dash_pattern() {
        let (company, title) = extract_company_and_title("Acme Corp - Senior Backend Engineer");
        assert_eq!(company, "Acme Corp");
        assert_eq!(title, "Senior Backend Engineer");
    }

    #[test]
    fn defaults_to_unknown_company_without_separator() {
        let (company, _) = extract_company_and_title("Senior Backend Engineer");
        assert_eq!(company, "Unknown Company");
    }

    #[test]
    fn rejects_index_page_and_blocked_role_urls() {
        let allow = vec!["/jobs/".to_string()];
        let deny = vec!["/jobs/search".to_string()];
        assert!(url_matches("https://boards.example.com/jobs/12345", &allow, &deny));
        assert!(!url_matches("https://boards.example.com/jobs/search?q=x", &allow, &deny));
    }

    #[test]
    fn blocks_sales_titles() {
        assert!(is_blocked_title("Regional Sales Manager"));
        assert!(!is_blocked_title("Backend Engineer"));
    }

    #[test]
    fn parses_relative_phrases() {
        assert_eq!(parse_relative_snippet_date("Posted 3 days ago").as_deref(), Some("3 days ago"));
        assert_eq!(parse_relative_snippet_date("Posted yesterday").as_deref(), Some("yesterday"));
        assert_eq!(parse_relative_snippet_date("Posted in March"), None);
    }
}
