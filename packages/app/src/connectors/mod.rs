pub mod ashby;
pub mod generic_careers_page;
pub mod greenhouse;
pub mod icims;
pub mod lever;
pub mod search_aggregator;
pub mod smartrecruiters;
pub mod successfactors;
pub mod workable;

use std::collections::HashMap;

use async_trait::async_trait;
use fetcher::RateLimitedFetcher;

use crate::domain::raw_job::RawJob;
use crate::rules::{SourceDef, SourceRules};
use crate::search::SearchClient;

/// Result of one connector invocation for one company.
#[derive(Debug, Clone)]
pub struct ConnectorResult {
    pub source: String,
    pub company: String,
    pub jobs: Vec<RawJob>,
    pub success: bool,
    pub error: Option<String>,
    pub rate_limited: bool,
    pub response_time_ms: u64,
}

impl ConnectorResult {
    pub fn ok(source: &str, company: &str, jobs: Vec<RawJob>, response_time_ms: u64, rate_limited: bool) -> Self {
        Self {
            source: source.to_string(),
            company: company.to_string(),
            jobs,
            success: true,
            error: None,
            rate_limited,
            response_time_ms,
        }
    }

    pub fn failed(source: &str, company: &str, error: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            source: source.to_string(),
            company: company.to_string(),
            jobs: vec![],
            success: false,
            error: Some(error.into()),
            rate_limited: false,
            response_time_ms,
        }
    }
}

/// Which connector families a pipeline run should drive.
#[derive(Debug, Clone, Copy)]
pub struct RunConnectorOptions {
    pub include_ats: bool,
    pub include_aggregators: bool,
    pub include_underground: bool,
}

impl Default for RunConnectorOptions {
    fn default() -> Self {
        Self {
            include_ats: true,
            include_aggregators: true,
            include_underground: true,
        }
    }
}

impl RunConnectorOptions {
    pub fn ats_only() -> Self {
        Self {
            include_ats: true,
            include_aggregators: false,
            include_underground: false,
        }
    }
}

/// One named source connector, adapting a single platform's protocol to a
/// uniform `ConnectorResult`.
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(
        &self,
        company: &str,
        source_def: &SourceDef,
        fetcher: &RateLimitedFetcher,
    ) -> ConnectorResult;
}

/// One connector instance per entry in `sources.json`, keyed by that
/// entry's name (not its `type`) so the orchestrator's `self.connectors.get(name)`
/// lookup lines up with `self.rules.sources.sources`. Platform connectors are
/// zero-sized and stateless; `searchAggregator` entries each get their own
/// instance carrying that entry's URL allow/deny shape filters.
pub fn build_registry(sources: &SourceRules, search: &SearchClient) -> HashMap<String, Box<dyn Connector>> {
    let mut registry: HashMap<String, Box<dyn Connector>> = HashMap::new();

    for (name, def) in &sources.sources {
        let connector: Box<dyn Connector> = match def.source_type.as_str() {
            "greenhouse" => Box::new(greenhouse::GreenhouseConnector),
            "lever" => Box::new(lever::LeverConnector),
            "ashby" => Box::new(ashby::AshbyConnector),
            "workable" => Box::new(workable::WorkableConnector),
            "genericCareersPage" => Box::new(generic_careers_page::GenericCareersPageConnector),
            "icims" => Box::new(icims::IcimsConnector),
            "smartrecruiters" => Box::new(smartrecruiters::SmartRecruitersConnector),
            "successfactors" => Box::new(successfactors::SuccessFactorsConnector),
            "searchAggregator" => Box::new(search_aggregator::SearchAggregatorConnector {
                source_name: name.clone(),
                search: search.clone(),
                url_allow: def.url_allow.clone(),
                url_deny: def.url_deny.clone(),
            }),
            other => {
                tracing::warn!(source = name.as_str(), source_type = other, "unknown source type, skipping registration");
                continue;
            }
        };
        registry.insert(name.clone(), connector);
    }

    registry
}

/// Anchor text substrings that mark a link as chrome rather than a posting
/// (nav/CTA text), used by the HTML connectors' broad fallback pass.
const NON_JOB_ANCHOR_TEXT: &[&str] = &["apply", "learn more", "view all", "see all", "read more"];

/// De-duplicate anchors by resolved href within one page fetch, keeping
/// the first occurrence.
pub fn dedupe_by_href(anchors: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut seen = std::collections::HashSet::new();
    anchors.into_iter().filter(|(_, href)| seen.insert(href.clone())).collect()
}

/// The broader fallback pass a page-parser connector runs when its primary
/// selector set yields nothing: any anchor whose href contains a known
/// job-path marker, excluding obvious nav/CTA anchors.
pub fn broad_job_anchors(anchors: &[(String, String)], job_path_markers: &[&str]) -> Vec<(String, String)> {
    anchors
        .iter()
        .filter(|(text, href)| {
            let lower_href = href.to_lowercase();
            let lower_text = text.to_lowercase();
            let has_marker = job_path_markers.iter().any(|m| lower_href.contains(m));
            let is_excluded = NON_JOB_ANCHOR_TEXT.iter().any(|kw| lower_text.contains(kw));
            has_marker && !is_excluded
        })
        .cloned()
        .collect()
}

/// Builds a synthetic stable id when a platform omits one: `hash(source,
/// company, title)`.
pub fn synthetic_job_id(source: &str, company: &str, title: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"|");
    hasher.update(company.as_bytes());
    hasher.update(b"|");
    hasher.update(title.as_bytes());
    format!("{:x}", hasher.finalize())
}
