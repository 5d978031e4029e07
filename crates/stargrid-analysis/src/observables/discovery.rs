//! Probability of having found a cell of a given value, round by round.
//!
//! Every cell whose value belongs to the target set is one sample unit.
//! Its curve gives, for each round, the fraction of the players of its game
//! who had visited it by the end of that round. Cells are resampled to
//! estimate the mean curve.

use serde::Serialize;
use stargrid_stats::bootstrap::{Bootstrap, BootstrapError, CentralEstimator, Estimate};

use super::component_means;
use crate::game::GameRecord;

/// Target value sets used by the `observables` command by default.
pub const DEFAULT_TARGETS: [&[u32]; 3] = [&[99], &[84, 85, 86], &[71, 72]];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryCurve {
    pub values: Vec<u32>,
    /// Number of matching cells over all games.
    pub cells: usize,
    /// `probability[r]`: fraction of players who found such a cell by the end
    /// of round `r + 1`.
    pub probability: Vec<Estimate>,
}

/// Per-cell discovery curves of the cells of `game` whose value is in
/// `values`.
#[must_use]
pub fn game_discovery_curves(game: &GameRecord, values: &[u32]) -> Vec<Vec<f64>> {
    let rounds = game.number_rounds();
    #[expect(clippy::cast_precision_loss)]
    let players = game.players().len().max(1) as f64;
    game.map()
        .iter()
        .enumerate()
        .filter(|&(_, value)| values.contains(value))
        .map(|(cell, _)| {
            let mut curve = vec![0.0; rounds];
            for player in game.players() {
                let first = player
                    .actions()
                    .iter()
                    .position(|round| round.iter().any(|action| action.cell == cell));
                if let Some(first) = first {
                    for found in &mut curve[first..] {
                        *found += 1.0;
                    }
                }
            }
            for found in &mut curve {
                *found /= players;
            }
            curve
        })
        .collect()
}

pub fn discovery_curve(
    games: &[GameRecord],
    values: &[u32],
    bootstrap: &Bootstrap,
) -> Result<DiscoveryCurve, BootstrapError> {
    let curves = games
        .iter()
        .flat_map(|game| game_discovery_curves(game, values))
        .collect::<Vec<_>>();
    let rounds = games.iter().map(GameRecord::number_rounds).max().unwrap_or(0);
    let probability = bootstrap.estimate_vec(&curves, CentralEstimator::Mean, |draw| {
        component_means(draw.iter().map(Vec::as_slice), rounds)
    })?;
    Ok(DiscoveryCurve {
        values: values.to_vec(),
        cells: curves.len(),
        probability,
    })
}

#[cfg(test)]
mod tests {
    use stargrid_stats::bootstrap::BootstrapSeed;

    use super::*;
    use crate::record::tests::sample_log;

    #[test]
    fn test_game_discovery_curves() {
        let game = GameRecord::from_log(&sample_log()).unwrap();
        // P2 finds 99 in round 1, P1 in round 2.
        assert_eq!(game_discovery_curves(&game, &[99]), vec![vec![0.5, 1.0]]);
        // 10 is found by both players, 40 only by P1; 0 never counts.
        assert_eq!(
            game_discovery_curves(&game, &[10, 40]),
            vec![vec![0.5, 1.0], vec![0.5, 0.5]]
        );
    }

    #[test]
    fn test_discovery_curve() {
        let game = GameRecord::from_log(&sample_log()).unwrap();
        let games = [game.clone(), game];
        let bootstrap = Bootstrap::new(50, BootstrapSeed::from_u128(4)).unwrap();
        let curve = discovery_curve(&games, &[10, 40], &bootstrap).unwrap();
        assert_eq!(curve.cells, 4);
        assert_eq!(curve.probability.len(), 2);
        assert_eq!(curve.probability[0].center, 0.5);
        assert_eq!(curve.probability[0].err_low, 0.0);
        assert!((0.5..=1.0).contains(&curve.probability[1].center));
    }

    #[test]
    fn test_no_matching_cell() {
        let games = [GameRecord::from_log(&sample_log()).unwrap()];
        let bootstrap = Bootstrap::new(10, BootstrapSeed::from_u128(4)).unwrap();
        assert_eq!(
            discovery_curve(&games, &[50], &bootstrap),
            Err(BootstrapError::EmptySample)
        );
    }
}
