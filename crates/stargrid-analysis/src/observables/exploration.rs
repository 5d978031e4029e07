//! Bootstrap of the per-round game observables over games.

use std::collections::BTreeMap;

use stargrid_stats::bootstrap::{Bootstrap, BootstrapError, CentralEstimator, Estimate};

use super::component_means;
use crate::game::{GameObservables, GameRecord};

/// Estimates of every series of [`GameObservables`], keyed by series name.
pub fn game_observables(
    games: &[GameRecord],
    bootstrap: &Bootstrap,
) -> Result<BTreeMap<&'static str, Vec<Estimate>>, BootstrapError> {
    if games.is_empty() {
        return Err(BootstrapError::EmptySample);
    }
    let observables = games.iter().map(GameRecord::observables).collect::<Vec<GameObservables>>();
    let rounds = games.iter().map(GameRecord::number_rounds).max().unwrap_or(0);
    let names = observables
        .first()
        .map(|obs| obs.series().into_iter().map(|(name, _)| name).collect::<Vec<_>>())
        .unwrap_or_default();

    let mut estimates = BTreeMap::new();
    for (i, name) in names.into_iter().enumerate() {
        let series = bootstrap.estimate_vec(&observables, CentralEstimator::Mean, |draw| {
            component_means(draw.iter().map(|obs| obs.series()[i].1), rounds)
        })?;
        estimates.insert(name, series);
    }
    log::debug!("estimated {} game observables", estimates.len());
    Ok(estimates)
}

#[cfg(test)]
mod tests {
    use stargrid_stats::bootstrap::BootstrapSeed;

    use super::*;
    use crate::observables::tests::{HONEST, INDIFFERENT, MISLEADING, build_games, synthetic_game};

    #[test]
    fn test_all_series_estimated() {
        let games = build_games(&[
            synthetic_game(1, &[(HONEST, 0), (MISLEADING, 0)]),
            synthetic_game(2, &[(INDIFFERENT, 0), (HONEST, 0)]),
        ]);
        let bootstrap = Bootstrap::new(100, BootstrapSeed::from_u128(9)).unwrap();
        let estimates = game_observables(&games, &bootstrap).unwrap();
        assert_eq!(estimates.len(), 13);
        assert!(estimates.values().all(|series| series.len() == 1));

        // Every cell is visited once per player, so the visit fractions are
        // uniform in both games.
        let ipr = estimates["visit_ipr"][0];
        assert!((ipr.center - 4.0).abs() < 1e-12);
        assert!(ipr.err_low.abs() < 1e-12);
    }

    #[test]
    fn test_empty_input() {
        let bootstrap = Bootstrap::new(10, BootstrapSeed::from_u128(9)).unwrap();
        assert_eq!(
            game_observables(&[], &bootstrap),
            Err(BootstrapError::EmptySample)
        );
    }
}
