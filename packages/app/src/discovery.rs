//! Board discovery (C3): turns preconfigured search queries into rows in
//! the `discovered_boards` registry by matching each result's link against
//! an ordered list of known ATS URL patterns.

use std::time::Duration;

use regex::Regex;
use sqlx::PgPool;

use crate::domain::discovered_board::DiscoveredBoardId;
use crate::rules::SourceRules;
use crate::search::SearchClient;

const DISCOVERY_CONFIDENCE: f32 = 0.75;
const QUERY_DELAY: Duration = Duration::from_millis(1500);

/// One ATS URL shape to recognize, in match-priority order. The capture
/// group extracts the board slug.
pub struct AtsPattern {
    pub platform: &'static str,
    pub regex: Regex,
}

pub fn default_patterns() -> Vec<AtsPattern> {
    vec![
        AtsPattern {
            platform: "greenhouse",
            regex: Regex::new(r"boards\.greenhouse\.io/([a-zA-Z0-9_-]+)").unwrap(),
        },
        AtsPattern {
            platform: "lever",
            regex: Regex::new(r"jobs\.lever\.co/([a-zA-Z0-9_-]+)").unwrap(),
        },
        AtsPattern {
            platform: "ashby",
            regex: Regex::new(r"jobs\.ashbyhq\.com/([a-zA-Z0-9_-]+)").unwrap(),
        },
        AtsPattern {
            platform: "workable",
            regex: Regex::new(r"apply\.workable\.com/([a-zA-Z0-9_-]+)").unwrap(),
        },
    ]
}

/// One discovered board, built from a search result that matched a known
/// ATS pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryHit {
    pub platform: String,
    pub board_url: String,
    pub board_slug: String,
}

/// Match `link` against `patterns` in order, returning the first hit.
pub fn match_ats_pattern(link: &str, patterns: &[AtsPattern]) -> Option<DiscoveryHit> {
    for pattern in patterns {
        if let Some(caps) = pattern.regex.captures(link) {
            let slug = caps.get(1)?.as_str().to_string();
            let board_url = canonical_board_url(pattern.platform, &slug);
            return Some(DiscoveryHit {
                platform: pattern.platform.to_string(),
                board_url,
                board_slug: slug,
            });
        }
    }
    None
}

fn canonical_board_url(platform: &str, slug: &str) -> String {
    match platform {
        "greenhouse" => format!("https://boards.greenhouse.io/{slug}"),
        "lever" => format!("https://jobs.lever.co/{slug}"),
        "ashby" => format!("https://jobs.ashbyhq.com/{slug}"),
        "workable" => format!("https://apply.workable.com/{slug}"),
        other => format!("https://{other}/{slug}"),
    }
}

/// Queries driving discovery: every `sources.json` entry tagged
/// `category: "discovery"`, flattened in declaration order.
pub fn collect_queries(sources: &SourceRules) -> Vec<String> {
    sources
        .sources
        .values()
        .filter(|def| def.category.as_deref() == Some("discovery"))
        .flat_map(|def| def.queries.iter().cloned())
        .collect()
}

/// Run every preconfigured query through the search API once, upserting
/// any ATS-shaped result into the registry. Idempotent: re-running with
/// the same queries only ever bumps `confidence`/`last_seen_at`.
pub async fn run_discovery(queries: &[String], search: &SearchClient, pool: &PgPool) -> anyhow::Result<Vec<DiscoveredBoardId>> {
    if !search.is_enabled() {
        return Ok(Vec::new());
    }

    let patterns = default_patterns();
    let mut upserted = Vec::new();

    for (i, query) in queries.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(QUERY_DELAY).await;
        }

        let results = match search.search(query).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(query, error = %e, "discovery query failed");
                continue;
            }
        };

        for result in results {
            if let Some(hit) = match_ats_pattern(&result.link, &patterns) {
                let id = crate::domain::discovered_board::DiscoveredBoard::upsert(
                    &hit.platform,
                    &hit.board_url,
                    &hit.board_slug,
                    DISCOVERY_CONFIDENCE,
                    pool,
                )
                .await?;
                upserted.push(id);
            }
        }
    }

    Ok(upserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_greenhouse_board_url() {
        let patterns = default_patterns();
        let hit = match_ats_pattern("https://boards.greenhouse.io/acme/jobs/123", &patterns).unwrap();
        assert_eq!(hit.platform, "greenhouse");
        assert_eq!(hit.board_slug, "acme");
        assert_eq!(hit.board_url, "https://boards.greenhouse.io/acme");
    }

    #[test]
    fn returns_none_for_unrecognized_url() {
        let patterns = default_patterns();
        assert!(match_ats_pattern("https://example.com/careers", &patterns).is_none());
    }

    #[test]
    fn first_matching_pattern_wins() {
        let patterns = default_patterns();
        let hit = match_ats_pattern("https://jobs.lever.co/zenith", &patterns).unwrap();
        assert_eq!(hit.platform, "lever");
    }
}
