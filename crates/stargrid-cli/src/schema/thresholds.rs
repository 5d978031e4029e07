use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stargrid_analysis::{
    classify::{ClassificationThresholds, InvalidThresholdsError},
    thresholds::{DiscoveredThresholds, TypeCounts},
};

/// Persisted classification thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsFile {
    /// Boundary between defectors and neutrals
    pub def_neu: f64,
    /// Boundary between neutrals and collaborators
    pub neu_col: f64,
    /// Timestamp when the thresholds were discovered
    pub computed_at: DateTime<Utc>,
    /// Type counts of each population the thresholds were discovered from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub populations: Vec<PopulationCounts>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationCounts {
    /// Population label, the games file it was read from
    pub population: String,
    pub defectors: usize,
    pub neutrals: usize,
    pub collaborators: usize,
}

impl ThresholdsFile {
    pub fn from_discovered(discovered: &DiscoveredThresholds<String>, computed_at: DateTime<Utc>) -> Self {
        Self {
            def_neu: discovered.thresholds.def_neu(),
            neu_col: discovered.thresholds.neu_col(),
            computed_at,
            populations: discovered
                .counts
                .iter()
                .map(|(population, counts)| PopulationCounts::new(population.clone(), *counts))
                .collect(),
        }
    }

    pub fn to_thresholds(&self) -> Result<ClassificationThresholds, InvalidThresholdsError> {
        ClassificationThresholds::new(self.def_neu, self.neu_col)
    }
}

impl PopulationCounts {
    fn new(population: String, counts: TypeCounts) -> Self {
        let TypeCounts {
            defectors,
            neutrals,
            collaborators,
        } = counts;
        Self {
            population,
            defectors,
            neutrals,
            collaborators,
        }
    }
}
