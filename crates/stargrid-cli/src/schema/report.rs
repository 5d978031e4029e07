use std::collections::BTreeMap;

use serde::Serialize;
use stargrid_analysis::{
    classify::{ClassificationThresholds, ClassifiedPlayer, PlayerType},
    observables::{
        defectors::DefectorsEffect,
        discovery::DiscoveryCurve,
        highest_values::HighestValuesFound,
        occupancy::StarOccupancy,
        rank::RankTypeProportions,
        revisits::RevisitRates,
        scores::ScoreDistributions,
        stars::{MeanStarsByValue, StarDistributions, StarModels},
    },
};
use stargrid_stats::bootstrap::{BootstrapSeed, Estimate};

/// One classified player, as written by the `classify` command
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationRow {
    pub game: String,
    pub player: usize,
    pub score: i64,
    pub rank: usize,
    pub intercept: f64,
    pub slope: f64,
    pub residual_sq_error: f64,
    pub player_type: PlayerType,
}

impl From<&ClassifiedPlayer<'_>> for ClassificationRow {
    fn from(classified: &ClassifiedPlayer<'_>) -> Self {
        let player = classified.player;
        let classification = &classified.classification;
        Self {
            game: player.key().game.to_string(),
            player: player.key().player,
            score: player.score(),
            rank: player.rank(),
            intercept: classification.intercept,
            slope: classification.slope,
            residual_sq_error: classification.residual_sq_error,
            player_type: classification.player_type,
        }
    }
}

/// Bootstrapped observables of one rule, as written by the `observables`
/// command
#[derive(Debug, Clone, Serialize)]
pub struct ObservablesReport {
    pub rule_number: u32,
    pub games: usize,
    pub players: usize,
    pub bootstrap_reps: usize,
    /// Seed that reproduces every estimate of this report
    pub seed: BootstrapSeed,
    pub max_score: f64,
    pub thresholds: ClassificationThresholds,
    pub highest_values_found: HighestValuesFound,
    pub game_observables: BTreeMap<&'static str, Vec<Estimate>>,
    pub rank_type_proportions: RankTypeProportions,
    pub first_rank_defector_p_value: f64,
    pub defectors_effect: DefectorsEffect,
    pub mean_stars_by_value: MeanStarsByValue,
    pub star_distributions: StarDistributions,
    pub star_models: StarModels,
    pub star_occupancy: StarOccupancy,
    pub score_distributions: ScoreDistributions,
    /// One curve per target value set
    pub discovery: Vec<DiscoveryCurve>,
    pub revisit_rates: RevisitRates,
}
