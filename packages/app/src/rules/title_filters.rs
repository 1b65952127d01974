use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One of the three title-filter files (include / maybe / reject): a flat
/// list of lowercase substrings matched against the job title.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TitleFilterFile {
    pub patterns: Vec<String>,
}

impl TitleFilterFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading title filter from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing title filter from {}", path.display()))
    }

    pub fn matches(&self, lowercase_title: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| lowercase_title.contains(p.as_str()))
    }
}

/// The three title-filter pattern lists together, as consumed by the
/// normalizer's title-bucket logic.
#[derive(Debug, Clone, Default)]
pub struct TitleFilters {
    pub include: TitleFilterFile,
    pub maybe: TitleFilterFile,
    pub reject: TitleFilterFile,
}

impl TitleFilters {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            include: TitleFilterFile::load(dir.join("title_include.json"))?,
            maybe: TitleFilterFile::load(dir.join("title_maybe.json"))?,
            reject: TitleFilterFile::load(dir.join("title_reject.json"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_is_substring_based() {
        let file = TitleFilterFile {
            patterns: vec!["engineer".to_string()],
        };
        assert!(file.matches("senior software engineer"));
        assert!(!file.matches("account manager"));
    }
}
