use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use stargrid_analysis::thresholds::{self, discover_thresholds};
use stargrid_stats::clustering::MergeTieBreak;

use crate::{
    schema::thresholds::ThresholdsFile,
    util::{self, Output},
};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum TieBreak {
    /// Merge the equal-cost pair with the smaller slopes
    #[default]
    Lower,
    /// Merge the equal-cost pair with the larger slopes
    Upper,
}

impl From<TieBreak> for MergeTieBreak {
    fn from(tie_break: TieBreak) -> Self {
        match tie_break {
            TieBreak::Lower => MergeTieBreak::PreferLower,
            TieBreak::Upper => MergeTieBreak::PreferUpper,
        }
    }
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct DiscoverThresholdsArg {
    /// Games files; each file is one population (e.g. one rule)
    #[arg(long, num_args = 1.., required = true)]
    games: Vec<PathBuf>,
    /// Which merge Ward clustering takes when two merges cost the same
    #[arg(long, value_enum, default_value_t)]
    tie_break: TieBreak,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &DiscoverThresholdsArg) -> anyhow::Result<()> {
    let DiscoverThresholdsArg {
        games,
        tie_break,
        output,
    } = arg;

    let mut populations = vec![];
    for path in games {
        let games = util::read_games_file(path)?;
        let slopes = thresholds::fit_slopes(&games)?;
        eprintln!("  {} slopes fitted", slopes.len());
        populations.push((path.display().to_string(), slopes));
    }

    eprintln!("Clustering slopes...");
    let discovered =
        discover_thresholds(&populations, (*tie_break).into()).context("Failed to discover thresholds")?;

    eprintln!("Clusters:");
    for range in &discovered.ranges {
        eprintln!(
            "  {:<12} [{:+.4}, {:+.4}] ({} players)",
            range.player_type.to_string(),
            range.min, range.max, range.count
        );
    }
    eprintln!("Thresholds:");
    eprintln!("  def_neu: {:+.4}", discovered.thresholds.def_neu());
    eprintln!("  neu_col: {:+.4}", discovered.thresholds.neu_col());
    for (population, counts) in &discovered.counts {
        eprintln!(
            "  {population}: {} defectors, {} neutrals, {} collaborators",
            counts.defectors, counts.neutrals, counts.collaborators
        );
    }

    let file = ThresholdsFile::from_discovered(&discovered, Utc::now());
    Output::save_json(&file, output.as_deref())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::ValueEnum as _;

    use super::*;

    #[test]
    fn test_tie_break_mapping() {
        assert_eq!(MergeTieBreak::from(TieBreak::Lower), MergeTieBreak::PreferLower);
        assert_eq!(MergeTieBreak::from(TieBreak::Upper), MergeTieBreak::PreferUpper);
        assert_eq!(MergeTieBreak::from(TieBreak::default()), MergeTieBreak::default());
    }

    #[test]
    fn test_tie_break_names() {
        assert_eq!(TieBreak::from_str("lower", false), Ok(TieBreak::Lower));
        assert_eq!(TieBreak::from_str("upper", false), Ok(TieBreak::Upper));
        assert!(TieBreak::from_str("middle", false).is_err());
    }
}
