use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::types::ScoreBand;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshnessBracket {
    /// `None` means "no upper bound" — must sort last.
    pub max_hours: Option<f64>,
    pub points: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshnessConfig {
    pub brackets: Vec<FreshnessBracket>,
    pub low_confidence_cap: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bands {
    pub top_priority: BandConfig,
    pub good_match: BandConfig,
    pub worth_a_look: BandConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandConfig {
    pub min_score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weights {
    pub freshness: f64,
    pub location: f64,
    pub mode: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRules {
    pub freshness: FreshnessConfig,
    pub bands: Bands,
    pub weights: Weights,
}

impl ScoringRules {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scoring rules from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing scoring rules from {}", path.display()))
    }

    /// Freshness points for `hours_ago`, iterating brackets sorted by
    /// ascending `max_hours` with `None` (unbounded) sorted last; capped if
    /// the caller passes `low_confidence`.
    pub fn freshness_points(&self, hours_ago: f64, low_confidence: bool) -> i32 {
        let mut brackets: Vec<&FreshnessBracket> = self.freshness.brackets.iter().collect();
        brackets.sort_by(|a, b| match (a.max_hours, b.max_hours) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (Some(_), None) => std::cmp::Ordering::Less,
        });
        let points = brackets
            .iter()
            .find(|b| b.max_hours.map(|m| hours_ago <= m).unwrap_or(true))
            .map(|b| b.points)
            .unwrap_or(0);
        if low_confidence {
            points.min(self.freshness.low_confidence_cap)
        } else {
            points
        }
    }

    /// The highest band whose `min_score` is at most `score`; falls back to
    /// the lowest band (`worthALook`) if none qualify.
    pub fn band_for(&self, score: i32) -> ScoreBand {
        if score >= self.bands.top_priority.min_score {
            ScoreBand::TopPriority
        } else if score >= self.bands.good_match.min_score {
            ScoreBand::GoodMatch
        } else {
            ScoreBand::WorthALook
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ScoringRules {
        ScoringRules {
            freshness: FreshnessConfig {
                brackets: vec![
                    FreshnessBracket { max_hours: Some(48.0), points: 80 },
                    FreshnessBracket { max_hours: Some(24.0), points: 100 },
                    FreshnessBracket { max_hours: None, points: 0 },
                ],
                low_confidence_cap: 50,
            },
            bands: Bands {
                top_priority: BandConfig { min_score: 80 },
                good_match: BandConfig { min_score: 50 },
                worth_a_look: BandConfig { min_score: 0 },
            },
            weights: Weights { freshness: 1.0, location: 1.0, mode: 1.0 },
        }
    }

    #[test]
    fn picks_first_bracket_whose_max_hours_is_at_least_hours_ago() {
        let rules = sample();
        assert_eq!(rules.freshness_points(12.0, false), 100);
        assert_eq!(rules.freshness_points(36.0, false), 80);
        assert_eq!(rules.freshness_points(1000.0, false), 0);
    }

    #[test]
    fn low_confidence_cap_applies() {
        let rules = sample();
        assert_eq!(rules.freshness_points(12.0, true), 50);
    }

    #[test]
    fn scenario_freshness_bracket_with_low_confidence() {
        let rules = ScoringRules {
            freshness: FreshnessConfig {
                brackets: vec![
                    FreshnessBracket { max_hours: Some(24.0), points: 100 },
                    FreshnessBracket { max_hours: Some(48.0), points: 80 },
                    FreshnessBracket { max_hours: None, points: 0 },
                ],
                low_confidence_cap: 50,
            },
            bands: sample().bands,
            weights: sample().weights,
        };
        assert_eq!(rules.freshness_points(12.0, true), 50);
    }

    #[test]
    fn band_for_picks_highest_qualifying_band() {
        let rules = sample();
        assert_eq!(rules.band_for(90), ScoreBand::TopPriority);
        assert_eq!(rules.band_for(60), ScoreBand::GoodMatch);
        assert_eq!(rules.band_for(10), ScoreBand::WorthALook);
    }
}
