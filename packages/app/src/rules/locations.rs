use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One location tier, e.g. `L1` = "downtown Toronto".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationTier {
    pub label: String,
    pub points: i32,
    #[serde(default)]
    pub cities: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// `tierKey -> LocationTier`, conventionally `L1..L5`. Declaration order
/// matters for tie-breaking equal-point tiers, so this is loaded as an
/// ordered map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationRules {
    pub tiers: indexmap::IndexMap<String, LocationTier>,
}

impl LocationRules {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading location rules from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing location rules from {}", path.display()))
    }

    /// Tiers sorted by descending points, each retaining its original
    /// declaration index for tie-breaking.
    pub fn by_descending_points(&self) -> Vec<(usize, &str, &LocationTier)> {
        let mut tiers: Vec<(usize, &str, &LocationTier)> = self
            .tiers
            .iter()
            .enumerate()
            .map(|(i, (key, tier))| (i, key.as_str(), tier))
            .collect();
        tiers.sort_by(|a, b| b.2.points.cmp(&a.2.points).then(a.0.cmp(&b.0)));
        tiers
    }
}

impl Default for LocationRules {
    fn default() -> Self {
        Self {
            tiers: indexmap::IndexMap::new(),
        }
    }
}

/// Resolved location metadata for a normalized job.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationMatch {
    pub tier_key: String,
    pub points: i32,
    pub city: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LocationRules {
        let json = r#"{
            "L1": {"label": "Downtown Toronto", "points": 50, "cities": ["toronto"], "aliases": []},
            "L2": {"label": "GTA", "points": 30, "cities": ["mississauga", "brampton"], "aliases": []}
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn by_descending_points_orders_highest_first() {
        let rules = sample();
        let ordered = rules.by_descending_points();
        assert_eq!(ordered[0].1, "L1");
        assert_eq!(ordered[1].1, "L2");
    }

    #[test]
    fn tie_breaks_by_declaration_order() {
        let json = r#"{
            "L1": {"label": "A", "points": 10, "cities": [], "aliases": []},
            "L2": {"label": "B", "points": 10, "cities": [], "aliases": []}
        }"#;
        let rules: LocationRules = serde_json::from_str(json).unwrap();
        let ordered = rules.by_descending_points();
        assert_eq!(ordered[0].1, "L1");
        assert_eq!(ordered[1].1, "L2");
    }
}
