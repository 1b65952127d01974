use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Per-platform seed board slugs, e.g. `{"greenhouse": ["acme", "initech"]}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CompanyRules {
    pub by_platform: HashMap<String, Vec<String>>,
}

impl CompanyRules {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading company rules from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing company rules from {}", path.display()))
    }

    pub fn seeds_for(&self, platform: &str) -> &[String] {
        self.by_platform
            .get(platform)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}
