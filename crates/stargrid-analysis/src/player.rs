//! Per-player behavioral record.
//!
//! A [`PlayerRecord`] gathers everything the classifier and the observables
//! need about one player in one game: the visited cells, the stars given to
//! each value, the final score and the rank within the game.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;

use crate::{
    record::{Action, GameId},
    top_values::{TOP_SLOTS, TopValues},
};

/// Identity of a player within the whole data set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PlayerKey {
    pub game: GameId,
    /// 1-based player number.
    pub player: usize,
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-P{}", self.game, self.player)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    key: PlayerKey,
    actions: Vec<Vec<Action>>,
    score: i64,
    rank: usize,
    stars_by_value: BTreeMap<u32, Vec<u32>>,
    values_played: Vec<u32>,
    mean_stars_by_value: Vec<f64>,
    top_values_by_round: Vec<[f64; TOP_SLOTS]>,
}

impl PlayerRecord {
    /// Builds a record from the player's actions grouped by round.
    ///
    /// `rank` is the 1-based position of `score` within the game, see
    /// [`min_ranks_descending`].
    #[must_use]
    pub fn new(key: PlayerKey, actions: Vec<Vec<Action>>, score: i64, rank: usize) -> Self {
        let mut stars_by_value = BTreeMap::<u32, Vec<u32>>::new();
        let mut top = TopValues::default();
        let mut top_values_by_round = Vec::with_capacity(actions.len());
        for round in &actions {
            for action in round {
                stars_by_value
                    .entry(action.value)
                    .or_default()
                    .push(action.stars);
                top.visit(action.cell, action.value);
            }
            top_values_by_round.push(top.values());
        }
        let values_played = stars_by_value.keys().copied().collect();
        let mean_stars_by_value = stars_by_value.values().map(|stars| mean_stars(stars)).collect();

        Self {
            key,
            actions,
            score,
            rank,
            stars_by_value,
            values_played,
            mean_stars_by_value,
            top_values_by_round,
        }
    }

    #[must_use]
    pub fn key(&self) -> &PlayerKey {
        &self.key
    }

    /// Actions per round, in play order.
    #[must_use]
    pub fn actions(&self) -> &[Vec<Action>] {
        &self.actions
    }

    #[must_use]
    pub fn score(&self) -> i64 {
        self.score
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Every star rating given to each distinct value, in play order.
    #[must_use]
    pub fn stars_by_value(&self) -> &BTreeMap<u32, Vec<u32>> {
        &self.stars_by_value
    }

    /// Distinct values visited, ascending.
    #[must_use]
    pub fn values_played(&self) -> &[u32] {
        &self.values_played
    }

    /// Mean stars given to each entry of [`Self::values_played`].
    #[must_use]
    pub fn mean_stars_by_value(&self) -> &[f64] {
        &self.mean_stars_by_value
    }

    /// The three highest values found so far, at the end of each round.
    #[must_use]
    pub fn top_values_by_round(&self) -> &[[f64; TOP_SLOTS]] {
        &self.top_values_by_round
    }
}

#[expect(clippy::cast_precision_loss)]
fn mean_stars(stars: &[u32]) -> f64 {
    stars.iter().map(|&s| f64::from(s)).sum::<f64>() / stars.len() as f64
}

/// Ranks scores in descending order; tied scores share the smallest rank.
///
/// # Examples
///
/// ```
/// use stargrid_analysis::player::min_ranks_descending;
///
/// assert_eq!(min_ranks_descending(&[50, 50, 30, 10, 10]), vec![1, 1, 3, 4, 4]);
/// ```
#[must_use]
pub fn min_ranks_descending(scores: &[i64]) -> Vec<usize> {
    scores
        .iter()
        .map(|score| 1 + scores.iter().filter(|other| *other > score).count())
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn key(player: usize) -> PlayerKey {
        PlayerKey {
            game: GameId {
                session: 1,
                group: "A".to_owned(),
                game_number: 1,
                rule: 1,
                map_type: "R".to_owned(),
                map_number: 1,
            },
            player,
        }
    }

    /// A single-round record visiting one new cell per `(value, stars)` pair.
    pub(crate) fn record(player: usize, visits: &[(u32, u32)]) -> PlayerRecord {
        let actions = visits
            .iter()
            .enumerate()
            .map(|(cell, &(value, stars))| Action { cell, value, stars })
            .collect();
        PlayerRecord::new(key(player), vec![actions], 0, 1)
    }

    #[test]
    fn test_ranks_with_ties() {
        assert_eq!(min_ranks_descending(&[10, 20, 30]), vec![3, 2, 1]);
        assert_eq!(min_ranks_descending(&[7, 7, 7]), vec![1, 1, 1]);
        assert_eq!(min_ranks_descending(&[]), Vec::<usize>::new());
    }

    #[test]
    fn test_stars_grouped_by_value() {
        let player = record(1, &[(40, 2), (10, 5), (40, 4), (99, 0)]);
        assert_eq!(player.values_played(), &[10, 40, 99]);
        assert_eq!(player.stars_by_value()[&40], vec![2, 4]);
        assert_eq!(player.mean_stars_by_value(), &[5.0, 3.0, 0.0]);
    }

    #[test]
    fn test_top_values_per_round() {
        let actions = vec![
            vec![
                Action { cell: 0, value: 10, stars: 1 },
                Action { cell: 1, value: 40, stars: 2 },
            ],
            vec![
                Action { cell: 1, value: 40, stars: 2 },
                Action { cell: 2, value: 99, stars: 5 },
            ],
        ];
        let player = PlayerRecord::new(key(2), actions, 0, 1);
        assert_eq!(
            player.top_values_by_round(),
            &[[40.0, 10.0, -1.0], [99.0, 40.0, 10.0]]
        );
    }

    #[test]
    fn test_key_display() {
        assert_eq!(key(4).to_string(), "S01-A1-R1-MR-01-P4");
    }
}
