//! Distributions of individual and team scores.
//!
//! A player's score here is the sum of the values of the cells they visited,
//! whatever the rule of the game, normalized by the highest reachable score.
//! The team score of a game is the mean score of its players. Games are
//! resampled and, per draw, the density of both scores is evaluated on a
//! [`DensityHistogram`] together with their mean and median.

use serde::Serialize;
use stargrid_stats::{
    bootstrap::{Bootstrap, BootstrapError, CentralEstimator, Estimate},
    descriptive,
    histogram::DensityHistogram,
};

use crate::game::GameRecord;

/// Number of density centers over `[0, 1]`.
pub const SCORE_CENTERS: usize = 25;
/// Window width of the score density.
pub const SCORE_WINDOW: f64 = 0.15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    /// Density at each center of [`ScoreDistributions::centers`].
    pub pdf: Vec<Estimate>,
    pub mean: Estimate,
    pub median: Estimate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreDistributions {
    pub centers: Vec<f64>,
    pub player: ScoreSummary,
    pub team: ScoreSummary,
}

/// Normalized value score of every player of `game`, in player order.
#[must_use]
pub fn value_scores(game: &GameRecord, max_score: f64) -> Vec<f64> {
    game.players()
        .iter()
        .map(|player| {
            let total = player
                .actions()
                .iter()
                .flatten()
                .map(|action| f64::from(action.value))
                .sum::<f64>();
            total / max_score
        })
        .collect()
}

/// Density, mean and median of `values`, flattened.
fn summarize(histogram: &DensityHistogram, values: &[f64]) -> Vec<Option<f64>> {
    let pdf = match histogram.density(values) {
        Some(density) => density.into_iter().map(Some).collect(),
        None => vec![None; histogram.centers().len()],
    };
    let mean = descriptive::mean(values.iter().copied()).ok();
    let median = descriptive::median(values.iter().copied()).ok();
    pdf.into_iter().chain([mean, median]).collect()
}

fn unflatten(mut flat: Vec<Estimate>) -> ScoreSummary {
    let median = flat.pop().unwrap_or(Estimate::undefined());
    let mean = flat.pop().unwrap_or(Estimate::undefined());
    ScoreSummary { pdf: flat, mean, median }
}

pub fn score_distributions(
    games: &[GameRecord],
    max_score: f64,
    histogram: &DensityHistogram,
    bootstrap: &Bootstrap,
) -> Result<ScoreDistributions, BootstrapError> {
    let per_game = games
        .iter()
        .map(|game| value_scores(game, max_score))
        .collect::<Vec<_>>();
    let summary_len = histogram.centers().len() + 2;

    let mut player = bootstrap.estimate_vec(&per_game, CentralEstimator::Mean, |draw| {
        let players = draw.iter().flatten().copied().collect::<Vec<_>>();
        let teams = draw
            .iter()
            .filter_map(|scores| descriptive::mean(scores.iter().copied()).ok())
            .collect::<Vec<_>>();
        let mut flat = summarize(histogram, &players);
        flat.extend(summarize(histogram, &teams));
        flat
    })?;
    let team = player.split_off(summary_len.min(player.len()));

    Ok(ScoreDistributions {
        centers: histogram.centers().to_vec(),
        player: unflatten(player),
        team: unflatten(team),
    })
}

#[cfg(test)]
mod tests {
    use stargrid_stats::bootstrap::BootstrapSeed;

    use super::*;
    use crate::observables::tests::{HONEST, build_games, synthetic_game};

    #[test]
    fn test_value_scores_ignore_logged_score() {
        let games = build_games(&[synthetic_game(1, &[(HONEST, 10), (HONEST, 2000)])]);
        // Both players visit 0, 33, 66 and 99.
        assert_eq!(value_scores(&games[0], 198.0), vec![1.0, 1.0]);
    }

    #[test]
    fn test_score_distributions() {
        let games = build_games(&[
            synthetic_game(1, &[(HONEST, 0), (HONEST, 0)]),
            synthetic_game(2, &[(HONEST, 0)]),
        ]);
        let histogram = DensityHistogram::new(0.0, 1.0, 5, 0.25).unwrap();
        let bootstrap = Bootstrap::new(100, BootstrapSeed::from_u128(8)).unwrap();
        // Every player scores 198 / 396 = 0.5.
        let distributions = score_distributions(&games, 396.0, &histogram, &bootstrap).unwrap();

        assert_eq!(distributions.centers, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        for summary in [&distributions.player, &distributions.team] {
            assert_eq!(summary.mean.center, 0.5);
            assert_eq!(summary.median.center, 0.5);
            let pdf = summary.pdf.iter().map(|e| e.center).collect::<Vec<_>>();
            // 0.5 falls in the window (0.375, 0.625] only.
            assert_eq!(pdf, vec![0.0, 0.0, 4.0, 0.0, 0.0]);
        }
    }
}
