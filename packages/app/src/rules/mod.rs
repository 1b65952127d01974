pub mod companies;
pub mod locations;
pub mod modes;
pub mod scoring;
pub mod sources;
pub mod title_filters;

pub use companies::CompanyRules;
pub use locations::{LocationMatch, LocationRules};
pub use modes::ModeRules;
pub use scoring::ScoringRules;
pub use sources::{SourceDef, SourceRules};
pub use title_filters::TitleFilters;

use anyhow::Result;
use std::path::Path;

/// All rule/config files loaded together, as the normalizer, scoring engine,
/// connectors, and discovery job all need them.
#[derive(Debug, Clone)]
pub struct Rules {
    pub locations: LocationRules,
    pub title_filters: TitleFilters,
    pub modes: ModeRules,
    pub scoring: ScoringRules,
    pub sources: SourceRules,
    pub companies: CompanyRules,
}

impl Rules {
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            locations: LocationRules::load(dir.join("locations.json"))?,
            title_filters: TitleFilters::load(dir)?,
            modes: ModeRules::load(dir.join("modes.json"))?,
            scoring: ScoringRules::load(dir.join("scoring.json"))?,
            sources: SourceRules::load(dir.join("sources.json"))?,
            companies: CompanyRules::load(dir.join("companies.json"))?,
        })
    }
}
