use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RateLimiting {
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub delay_between_requests_ms: Option<u64>,
    #[serde(default)]
    pub batch_pause_ms: Option<u64>,
}

/// One entry in `sources.json`: the type determines which connector
/// implementation handles it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDef {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub endpoint_template: Option<String>,
    #[serde(default)]
    pub url_template: Option<String>,
    #[serde(default)]
    pub rate_limiting: RateLimiting,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub queries: Vec<String>,

    /// Which `RunConnectorOptions` family this source belongs to: `"ats"`,
    /// `"aggregator"`, or `"underground"`. Only meaningful alongside
    /// `sourceType = "searchAggregator"`; ATS-platform types are always
    /// treated as `"ats"` regardless of this field.
    #[serde(default)]
    pub category: Option<String>,
    /// URL substrings a search-aggregator result's link must contain (any
    /// match) to be accepted; empty means "accept any shape".
    #[serde(default)]
    pub url_allow: Vec<String>,
    /// URL substrings that disqualify a search-aggregator result outright,
    /// checked before `url_allow`.
    #[serde(default)]
    pub url_deny: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl SourceDef {
    /// Each connector MUST reject its config if the URL template it needs is
    /// absent, rather than silently fetching a malformed URL.
    pub fn require_endpoint_template(&self) -> Result<&str> {
        self.endpoint_template
            .as_deref()
            .context("source definition is missing endpointTemplate")
    }

    pub fn require_url_template(&self) -> Result<&str> {
        self.url_template
            .as_deref()
            .context("source definition is missing urlTemplate")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SourceRules {
    pub sources: HashMap<String, SourceDef>,
}

impl SourceRules {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading source rules from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing source rules from {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_endpoint_template_is_an_error() {
        let def = SourceDef {
            source_type: "greenhouse".to_string(),
            enabled: true,
            schedule: None,
            endpoint_template: None,
            url_template: None,
            rate_limiting: RateLimiting::default(),
            timeout_ms: 30_000,
            queries: vec![],
            category: None,
            url_allow: vec![],
            url_deny: vec![],
        };
        assert!(def.require_endpoint_template().is_err());
    }
}
