//! How often players go back to their best cells of the previous round.
//!
//! Each action of round `r > 1` is compared with the cells its player visited
//! in round `r - 1`, ranked by value. It counts as a revisit of the best,
//! second or third of those cells, or otherwise as exploration; every action
//! of the first round is exploration. Per game the counts are divided by the
//! number of players, and games are resampled.

use serde::Serialize;
use stargrid_stats::bootstrap::{Bootstrap, BootstrapError, CentralEstimator, Estimate};

use super::{component_means, split_estimates};
use crate::{game::GameRecord, player::PlayerRecord, record::CellIndex};

/// Number of categories: best, second, third, exploration.
const CATEGORIES: usize = 4;
const EXPLORE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevisitRates {
    /// `best[r]`: mean number of actions per player in round `r + 1` that
    /// revisit their best cell of the previous round.
    pub best: Vec<Estimate>,
    pub second: Vec<Estimate>,
    pub third: Vec<Estimate>,
    pub explore: Vec<Estimate>,
}

/// Category of each action of `player` in `round`, as an index into
/// best, second, third and exploration.
fn categorize(player: &PlayerRecord, round: usize) -> Vec<usize> {
    let actions = &player.actions()[round];
    let Some(previous) = round.checked_sub(1).map(|r| &player.actions()[r]) else {
        return vec![EXPLORE; actions.len()];
    };
    // Stable ascending sort: among equal values the later visit ranks higher.
    let mut ranked = previous.iter().collect::<Vec<_>>();
    ranked.sort_by_key(|action| action.value);
    let ranked = ranked.iter().rev().map(|action| action.cell).collect::<Vec<CellIndex>>();
    actions
        .iter()
        .map(|action| {
            ranked
                .iter()
                .take(EXPLORE)
                .position(|&cell| cell == action.cell)
                .unwrap_or(EXPLORE)
        })
        .collect()
}

/// Per-round counts of each category, averaged over the players of `game`.
#[must_use]
pub fn game_revisit_counts(game: &GameRecord) -> [Vec<f64>; CATEGORIES] {
    let rounds = game.number_rounds();
    let mut counts: [Vec<f64>; CATEGORIES] = std::array::from_fn(|_| vec![0.0; rounds]);
    for player in game.players() {
        for round in 0..player.actions().len().min(rounds) {
            for category in categorize(player, round) {
                counts[category][round] += 1.0;
            }
        }
    }
    #[expect(clippy::cast_precision_loss)]
    let players = game.players().len().max(1) as f64;
    for count in counts.iter_mut().flatten() {
        *count /= players;
    }
    counts
}

pub fn revisit_rates(games: &[GameRecord], bootstrap: &Bootstrap) -> Result<RevisitRates, BootstrapError> {
    let per_game = games.iter().map(game_revisit_counts).collect::<Vec<_>>();
    let rounds = games.iter().map(GameRecord::number_rounds).max().unwrap_or(0);
    let estimates = bootstrap.estimate_vec(&per_game, CentralEstimator::Mean, |draw| {
        (0..CATEGORIES)
            .flat_map(|k| component_means(draw.iter().map(|game| game[k].as_slice()), rounds))
            .collect()
    })?;
    let mut split = split_estimates(estimates, rounds).into_iter();
    let mut next = || split.next().unwrap_or_default();
    Ok(RevisitRates {
        best: next(),
        second: next(),
        third: next(),
        explore: next(),
    })
}

#[cfg(test)]
mod tests {
    use stargrid_stats::bootstrap::BootstrapSeed;

    use super::*;
    use crate::record::{GameLog, tests::sample_log};

    #[test]
    fn test_game_revisit_counts() {
        let game = GameRecord::from_log(&sample_log()).unwrap();
        let [best, second, third, explore] = game_revisit_counts(&game);
        // Round 2: P1 returns to 40 (its best) and tries 99, P2 returns to 99
        // (its best) and tries 10.
        assert_eq!(best, vec![0.0, 1.0]);
        assert_eq!(second, vec![0.0, 0.0]);
        assert_eq!(third, vec![0.0, 0.0]);
        assert_eq!(explore, vec![2.0, 1.0]);
    }

    #[test]
    fn test_ties_rank_later_visit_higher() {
        let log: GameLog = serde_json::from_str(
            r#"{
                "sessionNumber": 1, "groupId": "A", "gameNumber": 1,
                "ruleNumber": 1, "mapType": "R", "mapNumber": 1,
                "numberRounds": 2, "numberPlayers": 1, "mapSize": 2,
                "map": [[50, 50], [50, 10]],
                "actions": [
                    [1, "P1", 0, 0, 50, 3, 0],
                    [1, "P1", 1, 0, 50, 3, 0],
                    [2, "P1", 1, 0, 50, 3, 0],
                    [2, "P1", 0, 0, 50, 3, 0]
                ]
            }"#,
        )
        .unwrap();
        let game = GameRecord::from_log(&log).unwrap();
        let [best, second, _, _] = game_revisit_counts(&game);
        assert_eq!(best, vec![0.0, 1.0]);
        assert_eq!(second, vec![0.0, 1.0]);
    }

    #[test]
    fn test_revisit_rates() {
        let game = GameRecord::from_log(&sample_log()).unwrap();
        let bootstrap = Bootstrap::new(20, BootstrapSeed::from_u128(6)).unwrap();
        let rates = revisit_rates(&[game], &bootstrap).unwrap();
        assert_eq!(rates.best.iter().map(|e| e.center).collect::<Vec<_>>(), vec![0.0, 1.0]);
        assert_eq!(rates.explore.iter().map(|e| e.center).collect::<Vec<_>>(), vec![2.0, 1.0]);
    }
}
