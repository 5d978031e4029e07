//! Discovery of the slope thresholds separating behavioral types.
//!
//! The fitted slopes of all players, pooled across populations, are grouped
//! into three clusters with Ward linkage. The cluster with the smallest
//! minimum slope holds the defectors and the one with the largest minimum the
//! collaborators; the remaining cluster holds the neutrals. Each threshold
//! lies halfway between two adjacent clusters:
//!
//! ```text
//! def_neu = (max(defectors) + min(neutrals)) / 2
//! neu_col = (max(neutrals) + min(collaborators)) / 2
//! ```
//!
//! # Example
//!
//! ```
//! use stargrid_analysis::thresholds::discover_thresholds;
//! use stargrid_stats::clustering::MergeTieBreak;
//!
//! let populations = [("rule 1", vec![-5.0, -4.0, 0.0, 0.2, 5.0, 4.8])];
//! let discovered = discover_thresholds(&populations, MergeTieBreak::default()).unwrap();
//! assert!((discovered.thresholds.def_neu() + 2.0).abs() < 1e-12);
//! assert!((discovered.thresholds.neu_col() - 2.5).abs() < 1e-12);
//! ```

use serde::Serialize;
use stargrid_stats::clustering::{ClusteringError, MergeTieBreak, WardClustering};

use crate::{
    classify::{ClassificationThresholds, FitConvergenceError, InvalidThresholdsError, PlayerType, fit_stars},
    game::GameRecord,
};

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum ThresholdError {
    #[display("need at least 3 distinct slopes to separate player types, got {distinct}")]
    NotEnoughSlopes { distinct: usize },
    #[display("slopes must be finite")]
    NonFiniteSlope,
    #[display("{_0}")]
    #[from]
    InvalidThresholds(InvalidThresholdsError),
}

impl From<ClusteringError> for ThresholdError {
    fn from(err: ClusteringError) -> Self {
        match err {
            ClusteringError::NotEnoughValues { distinct, .. } => Self::NotEnoughSlopes { distinct },
            ClusteringError::NonFinite | ClusteringError::NoClusters => Self::NonFiniteSlope,
        }
    }
}

/// Number of players of each type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    pub defectors: usize,
    pub neutrals: usize,
    pub collaborators: usize,
}

impl TypeCounts {
    fn add(&mut self, player_type: PlayerType) {
        match player_type {
            PlayerType::Defector => self.defectors += 1,
            PlayerType::Neutral => self.neutrals += 1,
            PlayerType::Collaborator => self.collaborators += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.defectors + self.neutrals + self.collaborators
    }
}

/// Slope range covered by the players of one type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TypeRange {
    pub player_type: PlayerType,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredThresholds<P> {
    pub thresholds: ClassificationThresholds,
    /// Clusters in [`PlayerType::ALL`] order.
    pub ranges: [TypeRange; 3],
    /// Type counts of each input population, in input order.
    pub counts: Vec<(P, TypeCounts)>,
}

/// Fitted slopes of every player of `games`.
pub fn fit_slopes(games: &[GameRecord]) -> Result<Vec<f64>, FitConvergenceError> {
    games
        .iter()
        .flat_map(GameRecord::players)
        .map(|player| fit_stars(player).map(|fit| fit.slope))
        .collect()
}

/// Clusters the pooled slopes of `populations` and derives the thresholds.
pub fn discover_thresholds<P: Clone>(
    populations: &[(P, Vec<f64>)],
    tie_break: MergeTieBreak,
) -> Result<DiscoveredThresholds<P>, ThresholdError> {
    let pooled = populations
        .iter()
        .flat_map(|(_, slopes)| slopes.iter().copied())
        .collect::<Vec<_>>();
    let clustering = WardClustering::new(PlayerType::ALL.len())
        .with_tie_break(tie_break)
        .fit(&pooled)?;

    // Clusters are ordered by ascending minimum slope.
    let ranges: [TypeRange; 3] = std::array::from_fn(|i| {
        let cluster = &clustering.clusters[i];
        TypeRange {
            player_type: PlayerType::ALL[i],
            min: cluster.min,
            max: cluster.max,
            count: cluster.members.len(),
        }
    });
    let [defectors, neutrals, collaborators] = &ranges;
    let thresholds = ClassificationThresholds::new(
        f64::midpoint(defectors.max, neutrals.min),
        f64::midpoint(neutrals.max, collaborators.min),
    )?;

    let mut labels = clustering.labels.iter();
    let counts = populations
        .iter()
        .map(|(population, slopes)| {
            let mut counts = TypeCounts::default();
            for &label in labels.by_ref().take(slopes.len()) {
                counts.add(PlayerType::ALL[label]);
            }
            (population.clone(), counts)
        })
        .collect();

    log::info!(
        "discovered thresholds def_neu={:.4} neu_col={:.4} from {} slopes",
        thresholds.def_neu(),
        thresholds.neu_col(),
        pooled.len()
    );
    Ok(DiscoveredThresholds {
        thresholds,
        ranges,
        counts,
    })
}
