use chrono::{DateTime, Utc};

use crate::domain::types::{PostedAtConfidence, ScoreBand, WorkMode};
use crate::rules::Rules;

/// `score = scoreFreshness + scoreLocation + scoreMode`, plus the resulting
/// band. All four fields persist to the canonical job row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub freshness: i32,
    pub location: i32,
    pub mode: i32,
    pub total: i32,
    pub band: ScoreBand,
}

pub struct ScoringInput<'a> {
    pub posted_at: Option<DateTime<Utc>>,
    pub first_seen_at: DateTime<Utc>,
    pub posted_at_confidence: PostedAtConfidence,
    pub location_tier: Option<&'a str>,
    pub work_mode: WorkMode,
}

pub fn score(input: &ScoringInput, rules: &Rules) -> ScoreBreakdown {
    let anchor = input.posted_at.unwrap_or(input.first_seen_at);
    let hours_ago = (Utc::now() - anchor).num_minutes() as f64 / 60.0;
    let hours_ago = hours_ago.max(0.0);
    let low_confidence = input.posted_at_confidence == PostedAtConfidence::Low;

    let freshness = rules.scoring.freshness_points(hours_ago, low_confidence);

    let location = input
        .location_tier
        .and_then(|key| rules.locations.tiers.get(key))
        .map(|t| t.points)
        .unwrap_or(0);

    let mode = rules.modes.points_for(&input.work_mode.to_string());

    let total = freshness + location + mode;
    let band = rules.scoring.band_for(total);

    ScoreBreakdown {
        freshness,
        location,
        mode,
        total,
        band,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::locations::LocationTier;
    use crate::rules::modes::ModeRule;
    use crate::rules::scoring::{Bands, BandConfig, FreshnessBracket, FreshnessConfig, ScoringRules, Weights};
    use crate::rules::{CompanyRules, LocationRules, ModeRules, SourceRules, TitleFilters};
    use std::collections::HashMap;

    fn rules_with(location_points: i32, mode_points: i32, freshness_cap: i32) -> Rules {
        let mut tiers = indexmap::IndexMap::new();
        tiers.insert(
            "L1".to_string(),
            LocationTier { label: "Toronto".to_string(), points: location_points, cities: vec![], aliases: vec![] },
        );
        let mut modes = HashMap::new();
        modes.insert("remote".to_string(), ModeRule { points: mode_points, keywords: vec![] });
        modes.insert("unknown".to_string(), ModeRule { points: 0, keywords: vec![] });

        Rules {
            locations: LocationRules { tiers },
            title_filters: TitleFilters::default(),
            modes: ModeRules { modes },
            scoring: ScoringRules {
                freshness: FreshnessConfig {
                    brackets: vec![
                        FreshnessBracket { max_hours: Some(24.0), points: 100 },
                        FreshnessBracket { max_hours: Some(48.0), points: 80 },
                        FreshnessBracket { max_hours: None, points: 0 },
                    ],
                    low_confidence_cap: freshness_cap,
                },
                bands: Bands {
                    top_priority: BandConfig { min_score: 150 },
                    good_match: BandConfig { min_score: 80 },
                    worth_a_look: BandConfig { min_score: 0 },
                },
                weights: Weights { freshness: 1.0, location: 1.0, mode: 1.0 },
            },
            sources: SourceRules::default(),
            companies: CompanyRules::default(),
        }
    }

    #[test]
    fn scenario_freshness_bracket_with_low_confidence_cap() {
        let rules = rules_with(0, 0, 50);
        let input = ScoringInput {
            posted_at: Some(Utc::now() - chrono::Duration::hours(12)),
            first_seen_at: Utc::now(),
            posted_at_confidence: PostedAtConfidence::Low,
            location_tier: None,
            work_mode: WorkMode::Unknown,
        };
        let breakdown = score(&input, &rules);
        assert_eq!(breakdown.freshness, 50);
    }

    #[test]
    fn location_and_mode_points_are_added() {
        let rules = rules_with(30, 20, 50);
        let input = ScoringInput {
            posted_at: Some(Utc::now() - chrono::Duration::hours(1)),
            first_seen_at: Utc::now(),
            posted_at_confidence: PostedAtConfidence::High,
            location_tier: Some("L1"),
            work_mode: WorkMode::Remote,
        };
        let breakdown = score(&input, &rules);
        assert_eq!(breakdown.location, 30);
        assert_eq!(breakdown.mode, 20);
        assert_eq!(breakdown.total, 100 + 30 + 20);
    }

    #[test]
    fn band_defaults_to_lowest_when_no_band_qualifies() {
        let rules = rules_with(0, 0, 50);
        let input = ScoringInput {
            posted_at: Some(Utc::now() - chrono::Duration::days(30)),
            first_seen_at: Utc::now(),
            posted_at_confidence: PostedAtConfidence::High,
            location_tier: None,
            work_mode: WorkMode::Unknown,
        };
        let breakdown = score(&input, &rules);
        assert_eq!(breakdown.band, ScoreBand::WorthALook);
    }
}
