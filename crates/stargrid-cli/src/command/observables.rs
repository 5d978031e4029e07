use std::{num::NonZeroUsize, path::PathBuf, str::FromStr};

use anyhow::Context;
use stargrid_analysis::{
    binning::{REFERENCE_GROUPS, ValueBinning},
    classify,
    game::GameRecord,
    observables::{
        defectors::{self, DEFAULT_MAX_SCORE},
        discovery::{self, DEFAULT_TARGETS},
        exploration, highest_values, occupancy, rank, revisits,
        scores::{self, SCORE_CENTERS, SCORE_WINDOW},
        stars,
    },
};
use stargrid_stats::{
    bootstrap::{Bootstrap, BootstrapSeed},
    histogram::DensityHistogram,
};

use crate::{
    schema::report::ObservablesReport,
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ObservablesArg {
    /// Games file (JSON array of game logs)
    #[arg(long)]
    games: PathBuf,
    /// Thresholds file written by `discover-thresholds`
    #[arg(long)]
    thresholds: PathBuf,
    /// Only analyze the games played under this rule
    #[arg(long)]
    rule: u32,
    /// Number of bootstrap repetitions
    #[arg(long, default_value_t = 1000)]
    bootstrap_reps: usize,
    /// Bootstrap seed (32 hex digits); random if omitted
    #[arg(long)]
    seed: Option<BootstrapSeed>,
    /// Maximum individual score used to normalize team scores
    #[arg(long, default_value_t = DEFAULT_MAX_SCORE)]
    max_score: f64,
    /// Weight value bins by the map values of the analyzed games instead of
    /// using the reference binning
    #[arg(long)]
    weighted_binning: bool,
    /// Comma-separated cell values whose discovery is tracked together;
    /// repeat for several sets [default: 99, 84,85,86 and 71,72]
    #[arg(long = "find")]
    find: Vec<ValueSet>,
    /// Number of worker threads; defaults to the available parallelism
    #[arg(long)]
    threads: Option<NonZeroUsize>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ObservablesArg) -> anyhow::Result<()> {
    let ObservablesArg {
        games,
        thresholds,
        rule,
        bootstrap_reps,
        seed,
        max_score,
        weighted_binning,
        find,
        threads,
        output,
    } = arg;

    let games = util::read_games_file(games)?
        .into_iter()
        .filter(|game| game.id().rule == *rule)
        .collect::<Vec<_>>();
    anyhow::ensure!(!games.is_empty(), "No game played under rule {rule}");
    let thresholds = util::read_thresholds_file(thresholds)?;

    let mut bootstrap = match seed {
        Some(seed) => Bootstrap::new(*bootstrap_reps, *seed)?,
        None => Bootstrap::with_random_seed(*bootstrap_reps)?,
    };
    if let Some(threads) = threads {
        bootstrap = bootstrap.with_threads(*threads);
    }
    eprintln!(
        "Rule {rule}: {} games, {} bootstrap repetitions, seed {}",
        games.len(),
        bootstrap.repetitions(),
        bootstrap.seed()
    );

    let binning = if *weighted_binning {
        let map_values = games
            .iter()
            .flat_map(GameRecord::map)
            .copied()
            .collect::<Vec<_>>();
        ValueBinning::weighted(REFERENCE_GROUPS, &map_values)
    } else {
        ValueBinning::reference()
    };

    let classified = classify::classify_games(&games, &thresholds)?;
    let players = classified
        .iter()
        .flat_map(|game| game.players.iter().copied())
        .collect::<Vec<_>>();

    eprintln!("Computing highest values found...");
    let highest_values_found = highest_values::highest_values_found(&games, &bootstrap)?;
    eprintln!("Computing game observables...");
    let game_observables = exploration::game_observables(&games, &bootstrap)?;
    eprintln!("Computing rank proportions...");
    let rank_type_proportions = rank::rank_type_proportions(&classified, &bootstrap)?;
    let first_rank_defector_p_value = rank::first_rank_defector_p_value(&classified, &bootstrap)?;
    eprintln!("  First rank defector: p = {first_rank_defector_p_value:.4}");
    eprintln!("Computing defectors effect...");
    let defectors_effect = defectors::defectors_effect(&classified, *max_score, &bootstrap)?;
    for comparison in &defectors_effect.comparisons {
        eprintln!(
            "  {} -> {}: p_mean = {:.4}, p_median = {:.4}",
            comparison.from, comparison.to, comparison.p_mean, comparison.p_median
        );
    }
    eprintln!("Computing star statistics...");
    let mean_stars_by_value = stars::mean_stars_by_value(&players, &binning, &bootstrap)?;
    let star_distributions = stars::star_distributions(&players, &binning, &bootstrap)
        .context("Failed to estimate star distributions")?;
    let star_models = stars::star_models(&players, &binning, &bootstrap)?;
    eprintln!("Computing star occupancy...");
    let star_occupancy = occupancy::star_occupancy(&games, &bootstrap)?;
    eprintln!(
        "  epsilon = {:.4}, alpha = {:.4}",
        star_occupancy.epsilon.center, star_occupancy.alpha.center
    );
    eprintln!("Computing score distributions...");
    let histogram = DensityHistogram::new(0.0, 1.0, SCORE_CENTERS, SCORE_WINDOW)?;
    let score_distributions = scores::score_distributions(&games, *max_score, &histogram, &bootstrap)?;
    eprintln!("Computing discovery probabilities...");
    let targets: Vec<Vec<u32>> = if find.is_empty() {
        DEFAULT_TARGETS.iter().map(|values| values.to_vec()).collect()
    } else {
        find.iter().map(|set| set.0.clone()).collect()
    };
    let discovery = targets
        .iter()
        .map(|values| {
            discovery::discovery_curve(&games, values, &bootstrap)
                .with_context(|| format!("No cell with value in {values:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    eprintln!("Computing revisit rates...");
    let revisit_rates = revisits::revisit_rates(&games, &bootstrap)?;

    let report = ObservablesReport {
        rule_number: *rule,
        games: games.len(),
        players: players.len(),
        bootstrap_reps: bootstrap.repetitions(),
        seed: bootstrap.seed(),
        max_score: *max_score,
        thresholds,
        highest_values_found,
        game_observables,
        rank_type_proportions,
        first_rank_defector_p_value,
        defectors_effect,
        mean_stars_by_value,
        star_distributions,
        star_models,
        star_occupancy,
        score_distributions,
        discovery,
        revisit_rates,
    };
    Output::save_json(&report, output.as_deref())?;
    Ok(())
}

/// Comma-separated list of cell values.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValueSet(Vec<u32>);

impl FromStr for ValueSet {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',').map(|v| v.trim().parse()).collect::<Result<_, _>>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_set_parsing() {
        assert_eq!("84, 85,86".parse::<ValueSet>(), Ok(ValueSet(vec![84, 85, 86])));
        assert_eq!("99".parse::<ValueSet>(), Ok(ValueSet(vec![99])));
        assert!("99,x".parse::<ValueSet>().is_err());
    }
}
