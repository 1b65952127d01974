use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a job can be worked from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkMode {
    Onsite,
    Hybrid,
    Remote,
    Unknown,
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkMode::Onsite => write!(f, "onsite"),
            WorkMode::Hybrid => write!(f, "hybrid"),
            WorkMode::Remote => write!(f, "remote"),
            WorkMode::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for WorkMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "onsite" => Ok(WorkMode::Onsite),
            "hybrid" => Ok(WorkMode::Hybrid),
            "remote" => Ok(WorkMode::Remote),
            "unknown" => Ok(WorkMode::Unknown),
            _ => Err(anyhow!("invalid work mode: {}", s)),
        }
    }
}

/// Final priority bucket a canonical job lands in once scored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScoreBand {
    TopPriority,
    GoodMatch,
    WorthALook,
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreBand::TopPriority => write!(f, "topPriority"),
            ScoreBand::GoodMatch => write!(f, "goodMatch"),
            ScoreBand::WorthALook => write!(f, "worthALook"),
        }
    }
}

impl FromStr for ScoreBand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "topPriority" => Ok(ScoreBand::TopPriority),
            "goodMatch" => Ok(ScoreBand::GoodMatch),
            "worthALook" => Ok(ScoreBand::WorthALook),
            _ => Err(anyhow!("invalid score band: {}", s)),
        }
    }
}

/// Title-filter verdict from the normalizer's include/maybe/reject rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TitleBucket {
    Include,
    Maybe,
    Reject,
}

impl fmt::Display for TitleBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TitleBucket::Include => write!(f, "include"),
            TitleBucket::Maybe => write!(f, "maybe"),
            TitleBucket::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for TitleBucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "include" => Ok(TitleBucket::Include),
            "maybe" => Ok(TitleBucket::Maybe),
            "reject" => Ok(TitleBucket::Reject),
            _ => Err(anyhow!("invalid title bucket: {}", s)),
        }
    }
}

/// Lifecycle state of a canonical job record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
    Applied,
    Dismissed,
    Expired,
    Archived,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Active => write!(f, "active"),
            JobStatus::Applied => write!(f, "applied"),
            JobStatus::Dismissed => write!(f, "dismissed"),
            JobStatus::Expired => write!(f, "expired"),
            JobStatus::Archived => write!(f, "archived"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(JobStatus::Active),
            "applied" => Ok(JobStatus::Applied),
            "dismissed" => Ok(JobStatus::Dismissed),
            "expired" => Ok(JobStatus::Expired),
            "archived" => Ok(JobStatus::Archived),
            _ => Err(anyhow!("invalid job status: {}", s)),
        }
    }
}

/// The LLM fit analyzer's overall verdict on a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Strong,
    Moderate,
    Weak,
    Stretch,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Strong => write!(f, "strong"),
            Verdict::Moderate => write!(f, "moderate"),
            Verdict::Weak => write!(f, "weak"),
            Verdict::Stretch => write!(f, "stretch"),
        }
    }
}

impl FromStr for Verdict {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "strong" => Ok(Verdict::Strong),
            "moderate" => Ok(Verdict::Moderate),
            "weak" => Ok(Verdict::Weak),
            "stretch" => Ok(Verdict::Stretch),
            _ => Err(anyhow!("invalid verdict: {}", s)),
        }
    }
}

/// How much the normalizer trusts the `posted_at` it extracted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostedAtConfidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for PostedAtConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostedAtConfidence::High => write!(f, "high"),
            PostedAtConfidence::Medium => write!(f, "medium"),
            PostedAtConfidence::Low => write!(f, "low"),
        }
    }
}

impl FromStr for PostedAtConfidence {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(PostedAtConfidence::High),
            "medium" => Ok(PostedAtConfidence::Medium),
            "low" => Ok(PostedAtConfidence::Low),
            _ => Err(anyhow!("invalid posted-at confidence: {}", s)),
        }
    }
}

/// Which dedup pass matched a raw job against an existing canonical one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DedupMethod {
    UrlHash,
    FuzzyKey,
    ContentFingerprint,
}

impl fmt::Display for DedupMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupMethod::UrlHash => write!(f, "url_hash"),
            DedupMethod::FuzzyKey => write!(f, "fuzzy_key"),
            DedupMethod::ContentFingerprint => write!(f, "content_fingerprint"),
        }
    }
}

impl FromStr for DedupMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "url_hash" => Ok(DedupMethod::UrlHash),
            "fuzzy_key" => Ok(DedupMethod::FuzzyKey),
            "content_fingerprint" => Ok(DedupMethod::ContentFingerprint),
            _ => Err(anyhow!("invalid dedup method: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_mode_roundtrips() {
        for m in [WorkMode::Onsite, WorkMode::Hybrid, WorkMode::Remote, WorkMode::Unknown] {
            assert_eq!(m, m.to_string().parse::<WorkMode>().unwrap());
        }
    }

    #[test]
    fn score_band_roundtrips() {
        for b in [ScoreBand::TopPriority, ScoreBand::GoodMatch, ScoreBand::WorthALook] {
            assert_eq!(b, b.to_string().parse::<ScoreBand>().unwrap());
        }
    }

    #[test]
    fn title_bucket_roundtrips() {
        for b in [TitleBucket::Include, TitleBucket::Maybe, TitleBucket::Reject] {
            assert_eq!(b, b.to_string().parse::<TitleBucket>().unwrap());
        }
    }

    #[test]
    fn job_status_roundtrips() {
        for s in [
            JobStatus::Active,
            JobStatus::Applied,
            JobStatus::Dismissed,
            JobStatus::Expired,
            JobStatus::Archived,
        ] {
            assert_eq!(s, s.to_string().parse::<JobStatus>().unwrap());
        }
    }

    #[test]
    fn verdict_roundtrips() {
        for v in [Verdict::Strong, Verdict::Moderate, Verdict::Weak, Verdict::Stretch] {
            assert_eq!(v, v.to_string().parse::<Verdict>().unwrap());
        }
    }

    #[test]
    fn posted_at_confidence_roundtrips() {
        for c in [PostedAtConfidence::High, PostedAtConfidence::Medium, PostedAtConfidence::Low] {
            assert_eq!(c, c.to_string().parse::<PostedAtConfidence>().unwrap());
        }
    }

    #[test]
    fn dedup_method_roundtrips() {
        for m in [DedupMethod::UrlHash, DedupMethod::FuzzyKey, DedupMethod::ContentFingerprint] {
            assert_eq!(m, m.to_string().parse::<DedupMethod>().unwrap());
        }
    }

    #[test]
    fn rejects_unknown_variants() {
        assert!("sideways".parse::<WorkMode>().is_err());
        assert!("whatever".parse::<JobStatus>().is_err());
    }
}
