//! Highest values found, round by round.
//!
//! For each game the running top-3 values of every player are averaged over
//! the players, giving one curve per slot. Games are then resampled to
//! estimate the mean curve. Slots a player has not filled yet count as
//! [`EMPTY_SLOT`](crate::top_values::EMPTY_SLOT).

use serde::Serialize;
use stargrid_stats::bootstrap::{Bootstrap, BootstrapError, CentralEstimator, Estimate};

use super::component_means;
use crate::{game::GameRecord, top_values::TOP_SLOTS};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighestValuesFound {
    /// `by_slot[k][r]`: value of the `k+1`-th best cell found by the end of
    /// round `r + 1`.
    pub by_slot: [Vec<Estimate>; TOP_SLOTS],
}

/// Per-round mean over the players of `game` of each top slot.
#[must_use]
pub fn game_top_values(game: &GameRecord) -> [Vec<f64>; TOP_SLOTS] {
    std::array::from_fn(|k| {
        let rows = game
            .players()
            .iter()
            .map(|player| {
                player
                    .top_values_by_round()
                    .iter()
                    .map(|round| round[k])
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        component_means(rows.iter().map(Vec::as_slice), game.number_rounds())
            .into_iter()
            .map(|mean| mean.unwrap_or(f64::NAN))
            .collect()
    })
}

pub fn highest_values_found(
    games: &[GameRecord],
    bootstrap: &Bootstrap,
) -> Result<HighestValuesFound, BootstrapError> {
    let per_game = games.iter().map(game_top_values).collect::<Vec<_>>();
    let rounds = games.iter().map(GameRecord::number_rounds).max().unwrap_or(0);

    let mut by_slot: [Vec<Estimate>; TOP_SLOTS] = Default::default();
    for (k, estimates) in by_slot.iter_mut().enumerate() {
        *estimates = bootstrap.estimate_vec(&per_game, CentralEstimator::Mean, |draw| {
            component_means(draw.iter().map(|game| game[k].as_slice()), rounds)
        })?;
    }
    Ok(HighestValuesFound { by_slot })
}

#[cfg(test)]
mod tests {
    use stargrid_stats::bootstrap::BootstrapSeed;

    use super::*;
    use crate::observables::tests::{HONEST, MISLEADING, build_games, synthetic_game};

    #[test]
    fn test_game_top_values() {
        let games = build_games(&[synthetic_game(1, &[(HONEST, 0), (MISLEADING, 0)])]);
        // Every player visits all four cells in the single round.
        let [first, second, third] = game_top_values(&games[0]);
        assert_eq!(first, vec![99.0]);
        assert_eq!(second, vec![66.0]);
        assert_eq!(third, vec![33.0]);
    }

    #[test]
    fn test_identical_games_have_zero_width() {
        let games = build_games(&[
            synthetic_game(1, &[(HONEST, 0)]),
            synthetic_game(2, &[(MISLEADING, 0)]),
        ]);
        let bootstrap = Bootstrap::new(200, BootstrapSeed::from_u128(5)).unwrap();
        let found = highest_values_found(&games, &bootstrap).unwrap();
        assert_eq!(found.by_slot[0].len(), 1);
        let estimate = found.by_slot[0][0];
        assert_eq!(estimate.center, 99.0);
        assert_eq!(estimate.err_low, 0.0);
        assert_eq!(estimate.err_high, 0.0);
    }

    #[test]
    fn test_no_games() {
        let bootstrap = Bootstrap::new(10, BootstrapSeed::from_u128(5)).unwrap();
        assert_eq!(
            highest_values_found(&[], &bootstrap),
            Err(BootstrapError::EmptySample)
        );
    }
}
