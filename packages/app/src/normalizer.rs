use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use sha2::{Digest, Sha256};

use crate::domain::raw_job::RawJob;
use crate::domain::types::{PostedAtConfidence, TitleBucket, WorkMode};
use crate::rules::Rules;

const LEGAL_SUFFIXES: &[&str] = &[
    "incorporated",
    "corporation",
    "limited",
    "inc",
    "llc",
    "ltd",
    "corp",
    "co",
    "plc",
    "gmbh",
    "ag",
    "sa",
];

/// Everything the normalizer derives from one `RawJob` plus the rule set.
#[derive(Debug, Clone)]
pub struct NormalizedFields {
    pub company: String,
    pub title_bucket: TitleBucket,
    pub location_tier: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub work_mode: WorkMode,
    pub posted_at: Option<DateTime<Utc>>,
    pub posted_at_confidence: PostedAtConfidence,
    pub url_hash: String,
    pub content_fingerprint: String,
}

/// Title bucket: reject is checked first regardless of declared order,
/// then include, then maybe; anything matching none of the three is
/// rejected.
pub fn title_bucket(title: &str, rules: &Rules) -> TitleBucket {
    let lower = title.to_lowercase();
    if rules.title_filters.reject.matches(&lower) {
        TitleBucket::Reject
    } else if rules.title_filters.include.matches(&lower) {
        TitleBucket::Include
    } else if rules.title_filters.maybe.matches(&lower) {
        TitleBucket::Maybe
    } else {
        TitleBucket::Reject
    }
}

/// Location tier: for each tier in descending points, substring-match the
/// lowercased `location_raw` against `cities ∪ aliases`. Highest points
/// wins; ties broken by declaration order. Remote tier never yields a
/// province; Ontario tiers yield "Ontario"; the BC tier yields
/// "British Columbia".
pub fn location_tier(location_raw: &str, rules: &Rules) -> (Option<String>, Option<String>, Option<String>) {
    let lower = location_raw.to_lowercase();
    for (_, key, tier) in rules.locations.by_descending_points() {
        let hit = tier
            .cities
            .iter()
            .chain(tier.aliases.iter())
            .any(|c| lower.contains(c.as_str()));
        if hit {
            let city = tier
                .cities
                .iter()
                .find(|c| lower.contains(c.as_str()))
                .cloned();
            let province = province_for_tier(key, &lower);
            return (Some(key.to_string()), city, province);
        }
    }
    (None, None, None)
}

fn province_for_tier(tier_key: &str, lower_location: &str) -> Option<String> {
    if lower_location.contains("remote") {
        return None;
    }
    let key_lower = tier_key.to_lowercase();
    if key_lower.contains("bc") || lower_location.contains("british columbia") || lower_location.contains(", bc") {
        Some("British Columbia".to_string())
    } else {
        Some("Ontario".to_string())
    }
}

const HYBRID_KEYWORDS: &[&str] = &["hybrid"];
const REMOTE_KEYWORDS: &[&str] = &["remote", "work from home", "wfh"];
const ONSITE_KEYWORDS: &[&str] = &["onsite", "on-site", "in-office", "in office"];

/// Work mode: hybrid keyword wins outright; remote + (onsite keyword OR a
/// concrete non-remote city) also counts as hybrid; else remote-only,
/// onsite-only, or unknown.
pub fn work_mode(content: &str, location_raw: &str, has_concrete_city: bool) -> WorkMode {
    let haystack = format!("{} {}", content, location_raw).to_lowercase();
    let has_hybrid = HYBRID_KEYWORDS.iter().any(|k| haystack.contains(k));
    let has_remote = REMOTE_KEYWORDS.iter().any(|k| haystack.contains(k));
    let has_onsite = ONSITE_KEYWORDS.iter().any(|k| haystack.contains(k));

    if has_hybrid {
        WorkMode::Hybrid
    } else if has_remote && (has_onsite || has_concrete_city) {
        WorkMode::Hybrid
    } else if has_remote {
        WorkMode::Remote
    } else if has_onsite {
        WorkMode::Onsite
    } else {
        WorkMode::Unknown
    }
}

/// Strip a trailing legal suffix (case-insensitive) and collapse whitespace.
pub fn normalize_company(company: &str) -> String {
    let collapsed = company.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_end_matches(|c: char| c == '.' || c == ',');
    let lower = trimmed.to_lowercase();

    for suffix in LEGAL_SUFFIXES {
        let with_space = format!(" {}", suffix);
        if lower.ends_with(suffix) && lower.len() > suffix.len() {
            let cut = trimmed.len() - suffix.len();
            if lower.ends_with(&with_space) || lower == *suffix {
                let candidate = trimmed[..cut].trim_end();
                let candidate = candidate.trim_end_matches(|c: char| c == '.' || c == ',');
                if !candidate.is_empty() {
                    return candidate.to_string();
                }
            }
        }
    }
    trimmed.to_string()
}

/// Parse a textual timestamp in the configured timezone, returning both the
/// UTC instant and a confidence tier. `None` + `Low` on parse failure.
pub fn parse_posted_at(raw: Option<&str>, timezone: &str) -> (Option<DateTime<Utc>>, PostedAtConfidence) {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return (None, PostedAtConfidence::Low);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return (Some(dt.with_timezone(&Utc)), PostedAtConfidence::High);
    }

    if let Some(relative) = parse_relative_phrase(raw, timezone) {
        return (Some(relative), PostedAtConfidence::Medium);
    }

    (None, PostedAtConfidence::Low)
}

fn parse_relative_phrase(raw: &str, timezone: &str) -> Option<DateTime<Utc>> {
    let tz: Tz = timezone.parse().ok()?;
    let now = Utc::now().with_timezone(&tz);
    let lower = raw.trim().to_lowercase();

    if lower == "today" {
        return Some(now.with_timezone(&Utc));
    }
    if lower == "yesterday" {
        return Some((now - chrono::Duration::days(1)).with_timezone(&Utc));
    }

    let parts: Vec<&str> = lower.split_whitespace().collect();
    if parts.len() >= 3 && parts[2] == "ago" {
        if let Ok(n) = parts[0].parse::<i64>() {
            let unit = parts[1].trim_end_matches('s');
            let delta = match unit {
                "hour" => Some(chrono::Duration::hours(n)),
                "day" => Some(chrono::Duration::days(n)),
                "week" => Some(chrono::Duration::weeks(n)),
                _ => None,
            };
            if let Some(delta) = delta {
                return Some((now - delta).with_timezone(&Utc));
            }
        }
    }

    None
}

/// SHA-256 of the lowercased URL with trailing slash and query string
/// stripped.
pub fn url_hash(url: &str) -> String {
    let lower = url.to_lowercase();
    let without_query = lower.split('?').next().unwrap_or(&lower);
    let without_slash = without_query.trim_end_matches('/');
    let mut hasher = Sha256::new();
    hasher.update(without_slash.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of content stripped of HTML tags, collapsed whitespace, and
/// lowercased.
pub fn content_fingerprint(content: &str) -> String {
    let stripped = fetcher::html::strip_tags(content);
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(collapsed.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn normalize(raw: &RawJob, rules: &Rules, timezone: &str) -> NormalizedFields {
    let bucket = title_bucket(&raw.title, rules);
    let (tier, city, province) = location_tier(&raw.location_raw, rules);
    let has_concrete_city = city.is_some();
    let mode = work_mode(&raw.content, &raw.location_raw, has_concrete_city);
    let company = normalize_company(&raw.company);
    let (posted_at, confidence) = if raw.posted_at.is_some() {
        (raw.posted_at, PostedAtConfidence::High)
    } else {
        parse_posted_at(raw.posted_at_raw.as_deref(), timezone)
    };

    NormalizedFields {
        company,
        title_bucket: bucket,
        location_tier: tier,
        city,
        province,
        work_mode: mode,
        posted_at,
        posted_at_confidence: confidence,
        url_hash: url_hash(&raw.url),
        content_fingerprint: content_fingerprint(&raw.content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_hash_ignores_case_trailing_slash_and_query() {
        let a = url_hash("https://boards.example.com/jobs/abc/");
        let b = url_hash("HTTPS://BOARDS.EXAMPLE.COM/jobs/abc?ref=foo");
        assert_eq!(a, b);
    }

    #[test]
    fn content_fingerprint_ignores_tags_and_case() {
        let a = content_fingerprint("<p>Hello   World</p>");
        let b = content_fingerprint("hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn normalize_company_strips_legal_suffix() {
        assert_eq!(normalize_company("Acme Inc."), "Acme");
        assert_eq!(normalize_company("Acme Corp"), "Acme");
        assert_eq!(normalize_company("Acme"), "Acme");
    }

    #[test]
    fn work_mode_hybrid_from_remote_plus_city() {
        let mode = work_mode("… hybrid/remote friendly …", "Toronto, ON", true);
        assert_eq!(mode, WorkMode::Hybrid);
    }

    #[test]
    fn work_mode_remote_only() {
        let mode = work_mode("fully remote position", "Anywhere", false);
        assert_eq!(mode, WorkMode::Remote);
    }

    #[test]
    fn work_mode_unknown_when_no_signal() {
        let mode = work_mode("great team culture", "", false);
        assert_eq!(mode, WorkMode::Unknown);
    }

    #[test]
    fn parse_posted_at_rfc3339_is_high_confidence() {
        let (dt, conf) = parse_posted_at(Some("2026-01-15T10:00:00Z"), "America/Toronto");
        assert!(dt.is_some());
        assert_eq!(conf, PostedAtConfidence::High);
    }

    #[test]
    fn parse_posted_at_relative_phrase_is_medium_confidence() {
        let (dt, conf) = parse_posted_at(Some("2 days ago"), "America/Toronto");
        assert!(dt.is_some());
        assert_eq!(conf, PostedAtConfidence::Medium);
    }

    #[test]
    fn parse_posted_at_unparseable_is_low_confidence_null() {
        let (dt, conf) = parse_posted_at(Some("whenever, man"), "America/Toronto");
        assert!(dt.is_none());
        assert_eq!(conf, PostedAtConfidence::Low);
    }
}
