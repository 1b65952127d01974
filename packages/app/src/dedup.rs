use chrono::{DateTime, Utc};
use strsim::jaro_winkler;

use crate::domain::canonical_job::CanonicalJob;
use crate::domain::types::DedupMethod;

const DUPLICATE_THRESHOLD: f64 = 0.85;
const POTENTIAL_DUPLICATE_THRESHOLD: f64 = 0.70;
const REPOST_WINDOW_DAYS: i64 = 7;

/// One entry in the in-memory fuzzy-dedup index: a recent active job's
/// identity key plus enough of its row to build a `JobDuplicate` edge.
#[derive(Debug, Clone)]
pub struct FuzzyIndexEntry {
    pub canonical_job_id: crate::domain::canonical_job::CanonicalJobId,
    pub key: String,
    pub first_seen_at: DateTime<Utc>,
}

/// The fuzzy-dedup index: built once per pipeline run from recent active
/// jobs, discarded at the end. Handles the empty-index case trivially.
#[derive(Debug, Clone, Default)]
pub struct FuzzyIndex {
    entries: Vec<FuzzyIndexEntry>,
}

impl FuzzyIndex {
    pub fn build(jobs: &[CanonicalJob]) -> Self {
        let entries = jobs
            .iter()
            .map(|j| FuzzyIndexEntry {
                canonical_job_id: j.id,
                key: fuzzy_key(&j.company, &j.title, j.city.as_deref().unwrap_or("")),
                first_seen_at: j.first_seen_at,
            })
            .collect();
        Self { entries }
    }

    /// Best fuzzy match for `key`, if any entry clears the potential-duplicate
    /// threshold.
    pub fn best_match(&self, key: &str) -> Option<(&FuzzyIndexEntry, f64)> {
        self.entries
            .iter()
            .map(|e| (e, jaro_winkler(key, &e.key)))
            .filter(|(_, sim)| *sim >= POTENTIAL_DUPLICATE_THRESHOLD)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Lowercased, whitespace-collapsed `"company | title | city"` identity key.
pub fn fuzzy_key(company: &str, title: &str, city: &str) -> String {
    let norm = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    format!("{} | {} | {}", norm(company), norm(title), norm(city))
}

/// Outcome of running a raw job's normalized identity through all three
/// dedup passes.
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum DedupOutcome {
    /// Not a duplicate by any pass.
    Unique,
    /// A certain duplicate; the pipeline must not insert a new canonical row.
    Duplicate {
        method: DedupMethod,
        existing_job_id: crate::domain::canonical_job::CanonicalJobId,
        similarity: f64,
    },
    /// A duplicate below full certainty: still inserted as its own canonical
    /// row, but linked via a `JobDuplicates` edge.
    PotentialDuplicate {
        existing_job_id: crate::domain::canonical_job::CanonicalJobId,
        similarity: f64,
    },
    /// Same content fingerprint as a job first seen more than 7 days ago:
    /// treated as a new posting with a backpointer.
    Repost {
        original_post_date: DateTime<Utc>,
    },
}

/// Pass 1: exact `urlHash` lookup.
pub fn check_url_hash(
    existing: Option<&CanonicalJob>,
) -> Option<DedupOutcome> {
    existing.map(|job| DedupOutcome::Duplicate {
        method: DedupMethod::UrlHash,
        existing_job_id: job.id,
        similarity: 1.0,
    })
}

/// Pass 2: fuzzy identity match against the pre-built index.
pub fn check_fuzzy(index: &FuzzyIndex, company: &str, title: &str, city: &str) -> Option<DedupOutcome> {
    let key = fuzzy_key(company, title, city);
    let (entry, similarity) = index.best_match(&key)?;
    if similarity >= DUPLICATE_THRESHOLD {
        Some(DedupOutcome::Duplicate {
            method: DedupMethod::FuzzyKey,
            existing_job_id: entry.canonical_job_id,
            similarity,
        })
    } else {
        Some(DedupOutcome::PotentialDuplicate {
            existing_job_id: entry.canonical_job_id,
            similarity,
        })
    }
}

/// Pass 3: content-fingerprint lookup among active jobs, oldest first.
/// A match within the repost window is a duplicate; outside it, a repost.
pub fn check_content_fingerprint(matches: &[CanonicalJob]) -> Option<DedupOutcome> {
    let oldest = matches.first()?;
    let age_days = (Utc::now() - oldest.first_seen_at).num_days();
    if age_days <= REPOST_WINDOW_DAYS {
        Some(DedupOutcome::Duplicate {
            method: DedupMethod::ContentFingerprint,
            existing_job_id: oldest.id,
            similarity: 1.0,
        })
    } else {
        let original_post_date = oldest.posted_at.unwrap_or(oldest.first_seen_at);
        Some(DedupOutcome::Repost { original_post_date })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::canonical_job::CanonicalJobId;
    use crate::domain::types::{JobStatus, PostedAtConfidence, ScoreBand, TitleBucket, WorkMode};

    fn sample_job(company: &str, title: &str, city: &str, first_seen_at: DateTime<Utc>) -> CanonicalJob {
        let mut job = CanonicalJob::new(
            None,
            "greenhouse",
            title,
            company,
            "https://example.com/jobs/1",
            "hash",
            "fingerprint",
            WorkMode::Remote,
            TitleBucket::Include,
            PostedAtConfidence::High,
        );
        job.city = Some(city.to_string());
        job.first_seen_at = first_seen_at;
        job.status = JobStatus::Active;
        job.score_band = ScoreBand::GoodMatch;
        job
    }

    #[test]
    fn scenario_fuzzy_dedup_after_legal_suffix_stripping() {
        let existing = sample_job("Acme", "Software Engineer", "Toronto", Utc::now());
        let index = FuzzyIndex::build(&[existing]);
        let outcome = check_fuzzy(&index, "Acme Inc.", "Software Engineer", "Toronto");
        match outcome {
            Some(DedupOutcome::Duplicate { method, similarity, .. }) => {
                assert_eq!(method, DedupMethod::FuzzyKey);
                assert!(similarity > 0.85);
            }
            other => panic!("expected duplicate, got {:?}", other),
        }
    }

    #[test]
    fn fuzzy_below_potential_threshold_is_unique() {
        let existing = sample_job("Zenith Holdings", "Marketing Lead", "Vancouver", Utc::now());
        let index = FuzzyIndex::build(&[existing]);
        let outcome = check_fuzzy(&index, "Acme", "Software Engineer", "Toronto");
        assert!(outcome.is_none());
    }

    #[test]
    fn empty_index_never_matches() {
        let index = FuzzyIndex::default();
        assert!(check_fuzzy(&index, "Acme", "Engineer", "Toronto").is_none());
    }

    #[test]
    fn scenario_repost_detection_outside_window() {
        let old = sample_job("Acme", "Engineer", "Toronto", Utc::now() - chrono::Duration::days(10));
        let outcome = check_content_fingerprint(&[old.clone()]);
        match outcome {
            Some(DedupOutcome::Repost { original_post_date }) => {
                assert_eq!(original_post_date, old.posted_at.unwrap());
            }
            other => panic!("expected repost, got {:?}", other),
        }
    }

    #[test]
    fn content_fingerprint_match_within_window_is_duplicate() {
        let recent = sample_job("Acme", "Engineer", "Toronto", Utc::now() - chrono::Duration::days(2));
        let outcome = check_content_fingerprint(&[recent]);
        matches!(outcome, Some(DedupOutcome::Duplicate { method: DedupMethod::ContentFingerprint, .. }));
    }
}
