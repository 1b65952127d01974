use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Per-work-mode scoring points and keyword list used both by the
/// normalizer (to detect the mode) and the scoring engine (to score it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeRule {
    pub points: i32,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ModeRules {
    pub modes: HashMap<String, ModeRule>,
}

impl ModeRules {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading mode rules from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing mode rules from {}", path.display()))
    }

    pub fn points_for(&self, mode: &str) -> i32 {
        self.modes
            .get(mode)
            .or_else(|| self.modes.get("unknown"))
            .map(|r| r.points)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_unknown_points() {
        let json = r#"{"remote": {"points": 20, "keywords": []}, "unknown": {"points": 5, "keywords": []}}"#;
        let rules: ModeRules = serde_json::from_str(json).unwrap();
        assert_eq!(rules.points_for("remote"), 20);
        assert_eq!(rules.points_for("onsite"), 5);
    }
}
