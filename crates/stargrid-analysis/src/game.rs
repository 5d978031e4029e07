//! Game-level records and per-round observables.
//!
//! A [`GameRecord`] is built from a validated [`GameLog`] and owns the
//! [`PlayerRecord`] of every player. [`GameObservables`] summarizes how the
//! whole group explored the map round by round.
//!
//! # Observables
//!
//! Let `n_c(r)` be the number of visits of cell `c` in round `r` and `s_c(r)`
//! the stars given to it. Their per-round fractions are `q_c(r)` and `p_c(r)`;
//! `Q_c(r)` and `P_c(r)` are the fractions of the counts cumulated up to round
//! `r`. With `V_c` the hidden cell values:
//!
//! - **Performance**: `Σ_c f_c V_c / D`, with `D` the mean of the three best
//!   map values for visit fractions and the best map value for star fractions
//! - **Inverse participation ratio**: `1 / Σ_c f_c²`, 0 when nothing was played
//! - **Fidelity**: `Σ_c sqrt(f_c V_c / Σ V)`
//! - **Value of best cells**: mean over players of the k-th highest value
//!   visited in the round

use serde::Serialize;

use crate::{
    player::{PlayerKey, PlayerRecord, min_ranks_descending},
    record::{Action, GameId, GameLog, MalformedRecordError, group_actions},
    top_values::TOP_SLOTS,
};

/// Rule under which the score is the sum of the discovered values.
pub const VALUE_SCORE_RULE: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    id: GameId,
    number_rounds: usize,
    /// Cell values indexed by [`crate::record::CellIndex`].
    map: Vec<u32>,
    players: Vec<PlayerRecord>,
}

impl GameRecord {
    /// Validates `log` and builds the records of all its players.
    ///
    /// Scores are the sum of the discovered values under
    /// [`VALUE_SCORE_RULE`], and the sum of the logged score field under any
    /// other rule.
    pub fn from_log(log: &GameLog) -> Result<Self, MalformedRecordError> {
        let id = log.id();
        let grouped = group_actions(log)?;
        let scores = grouped
            .iter()
            .map(|rounds| {
                rounds
                    .iter()
                    .flatten()
                    .map(|(row, _)| {
                        if log.rule_number == VALUE_SCORE_RULE {
                            i64::from(row.value)
                        } else {
                            row.score
                        }
                    })
                    .sum::<i64>()
            })
            .collect::<Vec<_>>();
        let ranks = min_ranks_descending(&scores);

        let players = grouped
            .into_iter()
            .zip(scores.iter().zip(&ranks))
            .enumerate()
            .map(|(index, (rounds, (&score, &rank)))| {
                let actions = rounds
                    .into_iter()
                    .map(|round| {
                        round
                            .into_iter()
                            .map(|(row, cell)| Action {
                                cell,
                                value: row.value,
                                stars: row.stars,
                            })
                            .collect()
                    })
                    .collect();
                let key = PlayerKey {
                    game: id.clone(),
                    player: index + 1,
                };
                PlayerRecord::new(key, actions, score, rank)
            })
            .collect();

        log::debug!("loaded game {id} with {} players", log.number_players);
        Ok(Self {
            id,
            number_rounds: log.number_rounds,
            map: log.map.iter().flatten().copied().collect(),
            players,
        })
    }

    #[must_use]
    pub fn id(&self) -> &GameId {
        &self.id
    }

    #[must_use]
    pub fn number_rounds(&self) -> usize {
        self.number_rounds
    }

    #[must_use]
    pub fn map(&self) -> &[u32] {
        &self.map
    }

    #[must_use]
    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    /// Computes the group-level observables of this game.
    #[must_use]
    pub fn observables(&self) -> GameObservables {
        GameObservables::new(self)
    }
}

/// Per-round observables of one game; every series has one entry per round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameObservables {
    pub visit_performance: Vec<f64>,
    pub cumulative_visit_performance: Vec<f64>,
    pub star_performance: Vec<f64>,
    pub cumulative_star_performance: Vec<f64>,
    pub visit_ipr: Vec<f64>,
    pub cumulative_visit_ipr: Vec<f64>,
    pub star_ipr: Vec<f64>,
    pub cumulative_star_ipr: Vec<f64>,
    pub cumulative_visit_fidelity: Vec<f64>,
    pub cumulative_star_fidelity: Vec<f64>,
    /// `best_cell_values[k]` is the mean value of the `k+1`-th best cell
    /// visited per player in each round.
    pub best_cell_values: [Vec<f64>; TOP_SLOTS],
}

impl GameObservables {
    fn new(game: &GameRecord) -> Self {
        let cells = game.map.len();
        let mut visits = vec![vec![0.0; cells]; game.number_rounds];
        let mut stars = vec![vec![0.0; cells]; game.number_rounds];
        for player in &game.players {
            for (round, actions) in player.actions().iter().enumerate() {
                for action in actions {
                    visits[round][action.cell] += 1.0;
                    stars[round][action.cell] += f64::from(action.stars);
                }
            }
        }

        let values = game.map.iter().map(|&v| f64::from(v)).collect::<Vec<_>>();
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| b.total_cmp(a));
        let best = sorted.first().copied().unwrap_or(0.0);
        #[expect(clippy::cast_precision_loss)]
        let best_three = sorted.iter().take(3).sum::<f64>() / sorted.len().clamp(1, 3) as f64;
        let value_sum = values.iter().sum::<f64>();

        let q = fractions(&visits);
        let big_q = fractions(&cumulate(&visits));
        let p = fractions(&stars);
        let big_p = fractions(&cumulate(&stars));

        Self {
            visit_performance: performance(&q, &values, best_three),
            cumulative_visit_performance: performance(&big_q, &values, best_three),
            star_performance: performance(&p, &values, best),
            cumulative_star_performance: performance(&big_p, &values, best),
            visit_ipr: inverse_participation_ratio(&q),
            cumulative_visit_ipr: inverse_participation_ratio(&big_q),
            star_ipr: inverse_participation_ratio(&p),
            cumulative_star_ipr: inverse_participation_ratio(&big_p),
            cumulative_visit_fidelity: fidelity(&big_q, &values, value_sum),
            cumulative_star_fidelity: fidelity(&big_p, &values, value_sum),
            best_cell_values: best_cell_values(game),
        }
    }

    /// Named view of every series, in a stable order.
    #[must_use]
    pub fn series(&self) -> Vec<(&'static str, &[f64])> {
        let [v1, v2, v3] = &self.best_cell_values;
        vec![
            ("visit_performance", self.visit_performance.as_slice()),
            ("cumulative_visit_performance", self.cumulative_visit_performance.as_slice()),
            ("star_performance", self.star_performance.as_slice()),
            ("cumulative_star_performance", self.cumulative_star_performance.as_slice()),
            ("visit_ipr", self.visit_ipr.as_slice()),
            ("cumulative_visit_ipr", self.cumulative_visit_ipr.as_slice()),
            ("star_ipr", self.star_ipr.as_slice()),
            ("cumulative_star_ipr", self.cumulative_star_ipr.as_slice()),
            ("cumulative_visit_fidelity", self.cumulative_visit_fidelity.as_slice()),
            ("cumulative_star_fidelity", self.cumulative_star_fidelity.as_slice()),
            ("best_cell_value_1", v1.as_slice()),
            ("best_cell_value_2", v2.as_slice()),
            ("best_cell_value_3", v3.as_slice()),
        ]
    }
}

fn cumulate(counts: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut running = vec![0.0; counts.first().map_or(0, Vec::len)];
    counts
        .iter()
        .map(|round| {
            for (total, count) in running.iter_mut().zip(round) {
                *total += count;
            }
            running.clone()
        })
        .collect()
}

/// Normalizes each round to sum to one; empty rounds stay all zero.
fn fractions(counts: &[Vec<f64>]) -> Vec<Vec<f64>> {
    counts
        .iter()
        .map(|round| {
            let total = round.iter().sum::<f64>();
            if total > 0.0 {
                round.iter().map(|c| c / total).collect()
            } else {
                vec![0.0; round.len()]
            }
        })
        .collect()
}

fn performance(fractions: &[Vec<f64>], values: &[f64], denominator: f64) -> Vec<f64> {
    fractions
        .iter()
        .map(|round| round.iter().zip(values).map(|(f, v)| f * v).sum::<f64>() / denominator)
        .collect()
}

fn inverse_participation_ratio(fractions: &[Vec<f64>]) -> Vec<f64> {
    fractions
        .iter()
        .map(|round| {
            let squares = round.iter().map(|f| f * f).sum::<f64>();
            if squares > 0.0 { 1.0 / squares } else { 0.0 }
        })
        .collect()
}

fn fidelity(fractions: &[Vec<f64>], values: &[f64], value_sum: f64) -> Vec<f64> {
    fractions
        .iter()
        .map(|round| {
            round
                .iter()
                .zip(values)
                .map(|(f, v)| (f * v / value_sum).sqrt())
                .sum()
        })
        .collect()
}

fn best_cell_values(game: &GameRecord) -> [Vec<f64>; TOP_SLOTS] {
    std::array::from_fn(|k| {
        (0..game.number_rounds)
            .map(|round| {
                let kth = game.players.iter().filter_map(|player| {
                    let mut played = player.actions()[round]
                        .iter()
                        .map(|action| action.value)
                        .collect::<Vec<_>>();
                    played.sort_unstable_by(|a, b| b.cmp(a));
                    played.get(k).map(|&v| f64::from(v))
                });
                stargrid_stats::descriptive::mean(kth).unwrap_or(f64::NAN)
            })
            .collect()
    })
}
