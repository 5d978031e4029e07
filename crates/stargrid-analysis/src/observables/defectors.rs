//! Team score against the number of defectors in a game.
//!
//! The team score of a game is the summed score of its players normalized by
//! `N · max_score`. Games are grouped by how many defectors they contain; each
//! group's mean and median team score are bootstrapped, and adjacent groups
//! are compared with one-sided p-values.

use serde::Serialize;
use stargrid_stats::bootstrap::{Bootstrap, BootstrapError, CentralEstimator, Estimate};

use crate::{
    classify::{ClassifiedGame, PlayerType},
    record::GameId,
};

/// Highest score a single player can reach on the experimental maps.
pub const DEFAULT_MAX_SCORE: f64 = 5420.0;

/// Pairs of defector counts compared by [`defectors_effect`].
pub const COMPARED_GROUPS: [(usize, usize); 3] = [(0, 1), (1, 2), (0, 2)];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamScore {
    pub game: GameId,
    pub defectors: usize,
    pub team_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefectorGroup {
    pub defectors: usize,
    pub games: usize,
    /// Bootstrapped mean team score, centered on the median replicate.
    pub mean: Estimate,
    /// Bootstrapped median team score, centered on the median replicate.
    pub median: Estimate,
}

/// P-values that games with `from` defectors do not score higher than games
/// with `to` defectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupComparison {
    pub from: usize,
    pub to: usize,
    pub p_mean: f64,
    pub p_median: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefectorsEffect {
    pub team_scores: Vec<TeamScore>,
    /// Non-empty groups, by ascending number of defectors.
    pub groups: Vec<DefectorGroup>,
    pub comparisons: Vec<GroupComparison>,
}

/// Summed score of the players of `game`, normalized by `N · max_score`.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn team_score(game: &ClassifiedGame<'_>, max_score: f64) -> f64 {
    let total = game
        .players
        .iter()
        .map(|p| p.player.score() as f64)
        .sum::<f64>();
    total / (game.players.len() as f64 * max_score)
}

pub fn defectors_effect(
    games: &[ClassifiedGame<'_>],
    max_score: f64,
    bootstrap: &Bootstrap,
) -> Result<DefectorsEffect, BootstrapError> {
    let team_scores = games
        .iter()
        .map(|game| TeamScore {
            game: game.game.id().clone(),
            defectors: game.count(PlayerType::Defector),
            team_score: team_score(game, max_score),
        })
        .collect::<Vec<_>>();

    let max_players = games.iter().map(|g| g.players.len()).max().unwrap_or(0);
    let mut by_defectors = vec![vec![]; max_players + 1];
    for score in &team_scores {
        by_defectors[score.defectors].push(score.team_score);
    }

    let mut groups = vec![];
    for (defectors, scores) in by_defectors.iter().enumerate() {
        if scores.is_empty() {
            log::debug!("no game with {defectors} defectors");
            continue;
        }
        groups.push(DefectorGroup {
            defectors,
            games: scores.len(),
            mean: bootstrap.estimate(scores, CentralEstimator::Median, |draw| draw.mean())?,
            median: bootstrap.estimate(scores, CentralEstimator::Median, |draw| draw.median())?,
        });
    }

    let mut comparisons = vec![];
    for (from, to) in COMPARED_GROUPS {
        let (Some(a), Some(b)) = (by_defectors.get(from), by_defectors.get(to)) else {
            continue;
        };
        if a.is_empty() || b.is_empty() {
            continue;
        }
        comparisons.push(GroupComparison {
            from,
            to,
            p_mean: bootstrap.p_value(a, b, |draw| draw.mean())?,
            p_median: bootstrap.p_value(a, b, |draw| draw.median())?,
        });
    }

    Ok(DefectorsEffect {
        team_scores,
        groups,
        comparisons,
    })
}

#[cfg(test)]
mod tests {
    use stargrid_stats::bootstrap::BootstrapSeed;

    use super::*;
    use crate::observables::tests::{
        HONEST, INDIFFERENT, MISLEADING, build_games, classified, synthetic_game,
    };

    #[test]
    fn test_team_score() {
        let games = build_games(&[synthetic_game(1, &[(HONEST, 100), (MISLEADING, 300)])]);
        let classified = classified(&games);
        assert!((team_score(&classified[0], 1000.0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_groups_and_comparisons() {
        let games = build_games(&[
            synthetic_game(1, &[(HONEST, 900), (INDIFFERENT, 900)]),
            synthetic_game(2, &[(HONEST, 800), (HONEST, 1000)]),
            synthetic_game(3, &[(HONEST, 500), (MISLEADING, 500)]),
            synthetic_game(4, &[(INDIFFERENT, 400), (MISLEADING, 600)]),
            synthetic_game(5, &[(MISLEADING, 100), (MISLEADING, 100)]),
        ]);
        let classified = classified(&games);
        let bootstrap = Bootstrap::new(400, BootstrapSeed::from_u128(23)).unwrap();
        let effect = defectors_effect(&classified, 1000.0, &bootstrap).unwrap();

        let defectors = effect
            .team_scores
            .iter()
            .map(|s| s.defectors)
            .collect::<Vec<_>>();
        assert_eq!(defectors, vec![0, 0, 1, 1, 2]);

        assert_eq!(effect.groups.len(), 3);
        assert_eq!(effect.groups[0].games, 2);
        assert!((effect.groups[0].median.center - 0.9).abs() < 1e-12);
        assert!((effect.groups[1].mean.center - 0.5).abs() < 1e-12);
        assert_eq!(effect.groups[2].mean.err_low, 0.0);

        // More defectors always score lower.
        assert_eq!(effect.comparisons.len(), 3);
        assert!(effect.comparisons.iter().all(|c| c.p_mean == 0.0 && c.p_median == 0.0));
    }

    #[test]
    fn test_missing_groups_are_skipped() {
        let games = build_games(&[synthetic_game(1, &[(HONEST, 100), (HONEST, 100)])]);
        let classified = classified(&games);
        let bootstrap = Bootstrap::new(50, BootstrapSeed::from_u128(1)).unwrap();
        let effect = defectors_effect(&classified, DEFAULT_MAX_SCORE, &bootstrap).unwrap();
        assert_eq!(effect.groups.len(), 1);
        assert!(effect.comparisons.is_empty());
    }
}
