use std::path::PathBuf;

use stargrid_analysis::classify::{self, PlayerType};

use crate::{
    schema::report::ClassificationRow,
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ClassifyArg {
    /// Games file (JSON array of game logs)
    #[arg(long)]
    games: PathBuf,
    /// Thresholds file written by `discover-thresholds`
    #[arg(long)]
    thresholds: PathBuf,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ClassifyArg) -> anyhow::Result<()> {
    let ClassifyArg {
        games,
        thresholds,
        output,
    } = arg;
    let games = util::read_games_file(games)?;
    let thresholds = util::read_thresholds_file(thresholds)?;

    let classified = classify::classify_games(&games, &thresholds)?;
    let mut rows = classified
        .iter()
        .flat_map(|game| &game.players)
        .map(ClassificationRow::from)
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| b.slope.total_cmp(&a.slope));

    eprintln!("Classified {} players:", rows.len());
    for player_type in PlayerType::ALL {
        let count = rows.iter().filter(|r| r.player_type == player_type).count();
        eprintln!("  {:<12} {count}", player_type.to_string());
    }

    Output::save_json(&rows, output.as_deref())?;
    Ok(())
}
