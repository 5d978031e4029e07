//! Star occupancy per cell value.
//!
//! `ρ(v)` is the share of all stars that a single cell of value `v`
//! receives: the stars given to cells of value `v`, divided by the number of
//! such cells on a map and by the total number of stars. Games are resampled;
//! cell counts are averaged over the drawn maps.
//!
//! # Occupancy model
//!
//! With `N` cells on a map, `n_u` of them of value `u`:
//!
//! ```text
//! ρ(v) = ε / N + (1 - ε) · v^α / Σ_u n_u u^α
//! ```
//!
//! A fraction `ε` of the stars is spread uniformly over the map and the rest
//! follows a power of the value. `(ε, α)` is fitted by least squares on
//! `log10 ρ(v)` with `ε ∈ [0, 1]` and `α ≥ 0`. Values that received no star
//! have no logarithm and are left out of the fit.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use stargrid_stats::{
    bootstrap::{Bootstrap, BootstrapError, CentralEstimator, Estimate},
    regression,
};

use crate::game::GameRecord;

/// Starting point `(ε, α)` of the model fit.
const INITIAL_GUESS: [f64; 2] = [0.5, 2.0];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarOccupancy {
    /// Distinct map values, ascending.
    pub values: Vec<u32>,
    /// `rho[i]`: occupancy of a cell of value `values[i]`.
    pub rho: Vec<Estimate>,
    pub epsilon: Estimate,
    pub alpha: Estimate,
    /// Model evaluated at `values` with the central `epsilon` and `alpha`,
    /// using the mean cell counts of all games.
    pub model: Vec<f64>,
}

/// Per-game stars and cell counts by value.
#[derive(Debug, Clone, Default)]
struct GameTally {
    stars: BTreeMap<u32, f64>,
    cells: BTreeMap<u32, f64>,
}

impl GameTally {
    fn new(game: &GameRecord) -> Self {
        let mut tally = Self::default();
        for &value in game.map() {
            *tally.cells.entry(value).or_default() += 1.0;
        }
        for action in game.players().iter().flat_map(|p| p.actions().iter().flatten()) {
            *tally.stars.entry(action.value).or_default() += f64::from(action.stars);
        }
        tally
    }
}

/// Occupancy model `ρ(value)` for maps with `cells[u]` cells of value `u`.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use stargrid_analysis::observables::occupancy::model_rho;
///
/// let cells = BTreeMap::from([(0, 2.0), (10, 2.0)]);
/// // Uniform spreading gives each of the 4 cells a quarter of the stars.
/// assert!((model_rho(&cells, 1.0, 3.0, 10) - 0.25).abs() < 1e-12);
/// // Without noise and with α = 1, cells of value 0 get nothing.
/// assert!((model_rho(&cells, 0.0, 1.0, 10) - 0.5).abs() < 1e-12);
/// assert_eq!(model_rho(&cells, 0.0, 1.0, 0), 0.0);
/// ```
#[must_use]
pub fn model_rho(cells: &BTreeMap<u32, f64>, epsilon: f64, alpha: f64, value: u32) -> f64 {
    let total = cells.values().sum::<f64>();
    let norm = cells
        .iter()
        .map(|(&u, &n)| n * f64::from(u).powf(alpha))
        .sum::<f64>();
    epsilon / total + (1.0 - epsilon) * f64::from(value).powf(alpha) / norm
}

/// Fits `(ε, α)` to the positive entries of `rho`.
///
/// Returns `None` with fewer than two usable values or when the fit fails.
#[must_use]
pub fn fit_occupancy(cells: &BTreeMap<u32, f64>, rho: &BTreeMap<u32, f64>) -> Option<(f64, f64)> {
    let (x, y): (Vec<f64>, Vec<f64>) = rho
        .iter()
        .filter(|&(_, &r)| r > 0.0)
        .map(|(&v, &r)| (f64::from(v), r.log10()))
        .unzip();
    let model = |v: f64, &[epsilon, alpha]: &[f64; 2]| {
        let total = cells.values().sum::<f64>();
        let norm = cells
            .iter()
            .map(|(&u, &n)| n * f64::from(u).powf(alpha))
            .sum::<f64>();
        (epsilon / total + (1.0 - epsilon) * v.powf(alpha) / norm).log10()
    };
    match regression::fit_curve(
        &x,
        &y,
        model,
        INITIAL_GUESS,
        [(0.0, 1.0), (0.0, f64::INFINITY)],
    ) {
        Ok(fit) => Some((fit.params[0], fit.params[1])),
        Err(err) => {
            log::debug!("cannot fit occupancy model: {err}");
            None
        }
    }
}

/// Occupancy of the stars given in the drawn games.
fn draw_occupancy<'a, I>(tallies: I) -> (BTreeMap<u32, f64>, BTreeMap<u32, f64>)
where
    I: IntoIterator<Item = &'a GameTally>,
{
    let mut stars = BTreeMap::<u32, f64>::new();
    let mut cells = BTreeMap::<u32, f64>::new();
    let mut games = 0_u32;
    for tally in tallies {
        games += 1;
        for (&value, &s) in &tally.stars {
            *stars.entry(value).or_default() += s;
        }
        for (&value, &n) in &tally.cells {
            *cells.entry(value).or_default() += n;
        }
    }
    for n in cells.values_mut() {
        *n /= f64::from(games.max(1));
    }
    let total = stars.values().sum::<f64>();
    let rho = cells
        .iter()
        .filter(|_| total > 0.0)
        .map(|(&value, &n)| (value, stars.get(&value).copied().unwrap_or(0.0) / n / total))
        .collect();
    (cells, rho)
}

pub fn star_occupancy(games: &[GameRecord], bootstrap: &Bootstrap) -> Result<StarOccupancy, BootstrapError> {
    let tallies = games.iter().map(GameTally::new).collect::<Vec<_>>();
    let values = tallies
        .iter()
        .flat_map(|t| t.cells.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();

    let mut estimates = bootstrap.estimate_vec(&tallies, CentralEstimator::Mean, |draw| {
        let (cells, rho) = draw_occupancy(draw.iter());
        let fit = fit_occupancy(&cells, &rho);
        values
            .iter()
            .map(|value| rho.get(value).copied())
            .chain([fit.map(|(e, _)| e), fit.map(|(_, a)| a)])
            .collect()
    })?;

    let alpha = estimates.pop().unwrap_or(Estimate::undefined());
    let epsilon = estimates.pop().unwrap_or(Estimate::undefined());
    let (cells, _) = draw_occupancy(&tallies);
    let model = values
        .iter()
        .map(|&value| model_rho(&cells, epsilon.center, alpha.center, value))
        .collect();
    Ok(StarOccupancy {
        values,
        rho: estimates,
        epsilon,
        alpha,
        model,
    })
}

#[cfg(test)]
mod tests {
    use stargrid_stats::bootstrap::BootstrapSeed;

    use super::*;
    use crate::observables::tests::{HONEST, build_games, synthetic_game};

    #[test]
    fn test_fit_recovers_model_parameters() {
        let cells = (0..10)
            .map(|i| (i * 11, f64::from(i % 3 + 1)))
            .collect::<BTreeMap<_, _>>();
        let rho = cells
            .keys()
            .map(|&v| (v, model_rho(&cells, 0.2, 1.5, v)))
            .collect::<BTreeMap<_, _>>();
        let (epsilon, alpha) = fit_occupancy(&cells, &rho).unwrap();
        assert!((epsilon - 0.2).abs() < 1e-4, "epsilon = {epsilon}");
        assert!((alpha - 1.5).abs() < 1e-4, "alpha = {alpha}");
    }

    #[test]
    fn test_fit_needs_two_values() {
        let cells = BTreeMap::from([(10, 1.0), (20, 1.0)]);
        let rho = BTreeMap::from([(10, 0.0), (20, 1.0)]);
        assert_eq!(fit_occupancy(&cells, &rho), None);
    }

    #[test]
    fn test_occupancy_of_identical_games() {
        let games = build_games(&[
            synthetic_game(1, &[(HONEST, 0)]),
            synthetic_game(2, &[(HONEST, 0), (HONEST, 0)]),
        ]);
        let bootstrap = Bootstrap::new(100, BootstrapSeed::from_u128(17)).unwrap();
        let occupancy = star_occupancy(&games, &bootstrap).unwrap();

        assert_eq!(occupancy.values, vec![0, 33, 66, 99]);
        let rho = occupancy.rho.iter().map(|e| e.center).collect::<Vec<_>>();
        for (got, want) in rho.iter().zip([0.0, 0.2, 0.3, 0.5]) {
            assert!((got - want).abs() < 1e-12, "{rho:?}");
        }
        assert!(occupancy.epsilon.is_defined());
        assert!((0.0..=1.0).contains(&occupancy.epsilon.center));
        assert!(occupancy.alpha.center >= 0.0);
        assert_eq!(occupancy.model.len(), 4);
    }
}
