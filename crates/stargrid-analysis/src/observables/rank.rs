//! Behavioral type against final rank.
//!
//! Games are resampled and, for each rank, the fraction of players of each
//! type holding that rank is computed. Ranks nobody holds in a draw (possible
//! with ties) are undefined for that draw.

use std::collections::BTreeMap;

use serde::Serialize;
use stargrid_stats::bootstrap::{Bootstrap, BootstrapError, CentralEstimator, Estimate, Resample};

use super::split_estimates;
use crate::classify::{ClassifiedGame, PlayerType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankTypeProportions {
    /// `by_type[t][r]`: fraction of rank `r + 1` players that are of type `t`.
    pub by_type: BTreeMap<PlayerType, Vec<Estimate>>,
}

pub fn rank_type_proportions(
    games: &[ClassifiedGame<'_>],
    bootstrap: &Bootstrap,
) -> Result<RankTypeProportions, BootstrapError> {
    let ranks = max_rank(games);
    let estimates = bootstrap.estimate_vec(games, CentralEstimator::Mean, |draw| {
        let counts = type_counts_by_rank(draw, ranks);
        PlayerType::ALL
            .iter()
            .flat_map(|&player_type| {
                counts.iter().map(move |by_type| {
                    let total = by_type.values().sum::<usize>();
                    #[expect(clippy::cast_precision_loss)]
                    let fraction = (total > 0)
                        .then(|| by_type.get(&player_type).copied().unwrap_or(0) as f64 / total as f64);
                    fraction
                })
            })
            .collect()
    })?;

    let by_type = PlayerType::ALL
        .into_iter()
        .zip(split_estimates(estimates, ranks))
        .collect();
    Ok(RankTypeProportions { by_type })
}

/// One-sided p-value against "defectors reach the first rank more often than
/// other players".
///
/// This is the fraction of draws in which the first-rank frequency of
/// defectors is not larger than that of the other players. Draws without any
/// defector or without any other player are ignored.
pub fn first_rank_defector_p_value(
    games: &[ClassifiedGame<'_>],
    bootstrap: &Bootstrap,
) -> Result<f64, BootstrapError> {
    // p_value_of_difference counts negative differences, so the difference is
    // taken as other - defector and the complement is returned.
    let larger = bootstrap.p_value_of_difference(games, |draw| {
        let mut defectors = (0_u32, 0_u32);
        let mut others = (0_u32, 0_u32);
        for player in draw.iter().flat_map(|game| &game.players) {
            let tally = if player.player_type() == PlayerType::Defector {
                &mut defectors
            } else {
                &mut others
            };
            tally.1 += 1;
            if player.player.rank() == 1 {
                tally.0 += 1;
            }
        }
        let frequency = |(first, total): (u32, u32)| (total > 0).then(|| f64::from(first) / f64::from(total));
        Some(frequency(others)? - frequency(defectors)?)
    })?;
    Ok(1.0 - larger)
}

fn max_rank(games: &[ClassifiedGame<'_>]) -> usize {
    games
        .iter()
        .flat_map(|game| &game.players)
        .map(|player| player.player.rank())
        .max()
        .unwrap_or(0)
}

fn type_counts_by_rank(
    draw: &Resample<'_, ClassifiedGame<'_>>,
    ranks: usize,
) -> Vec<BTreeMap<PlayerType, usize>> {
    let mut counts = vec![BTreeMap::new(); ranks];
    for player in draw.iter().flat_map(|game| &game.players) {
        *counts[player.player.rank() - 1]
            .entry(player.player_type())
            .or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use stargrid_stats::bootstrap::BootstrapSeed;

    use super::*;
    use crate::observables::tests::{
        HONEST, INDIFFERENT, MISLEADING, build_games, classified, synthetic_game,
    };

    fn bootstrap() -> Bootstrap {
        Bootstrap::new(500, BootstrapSeed::from_u128(17)).unwrap()
    }

    #[test]
    fn test_proportions_per_rank() {
        // Defectors always win, collaborators always come last.
        let games = build_games(&[
            synthetic_game(1, &[(HONEST, 10), (MISLEADING, 30), (INDIFFERENT, 20)]),
            synthetic_game(2, &[(MISLEADING, 50), (INDIFFERENT, 40), (HONEST, 5)]),
        ]);
        let classified = classified(&games);
        let proportions = rank_type_proportions(&classified, &bootstrap()).unwrap();

        let centers = |t: PlayerType| {
            proportions.by_type[&t]
                .iter()
                .map(|e| e.center)
                .collect::<Vec<_>>()
        };
        assert_eq!(centers(PlayerType::Defector), vec![1.0, 0.0, 0.0]);
        assert_eq!(centers(PlayerType::Neutral), vec![0.0, 1.0, 0.0]);
        assert_eq!(centers(PlayerType::Collaborator), vec![0.0, 0.0, 1.0]);

        let p = first_rank_defector_p_value(&classified, &bootstrap()).unwrap();
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_tied_ranks_leave_undefined_components() {
        let games = build_games(&[synthetic_game(1, &[(HONEST, 10), (MISLEADING, 10), (INDIFFERENT, 0)])]);
        let classified = classified(&games);
        let proportions = rank_type_proportions(&classified, &bootstrap()).unwrap();
        let defectors = &proportions.by_type[&PlayerType::Defector];
        assert_eq!(defectors.len(), 3);
        assert_eq!(defectors[0].center, 0.5);
        assert!(!defectors[1].is_defined());
        assert_eq!(defectors[2].center, 0.0);
    }

    #[test]
    fn test_losing_defectors_give_high_p_value() {
        let games = build_games(&[
            synthetic_game(1, &[(HONEST, 30), (MISLEADING, 10)]),
            synthetic_game(2, &[(INDIFFERENT, 30), (MISLEADING, 10)]),
        ]);
        let classified = classified(&games);
        let p = first_rank_defector_p_value(&classified, &bootstrap()).unwrap();
        assert_eq!(p, 1.0);
    }
}
